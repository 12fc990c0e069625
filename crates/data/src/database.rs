use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use short_straddle_core::{Document, DocumentFilter, DocumentId, DocumentStore, Result, StrategyError};

fn db_err(err: sqlx::Error) -> StrategyError {
    StrategyError::persistence(err.to_string())
}

/// Collection names are interpolated into SQL, so only plain identifiers pass.
fn checked_collection(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StrategyError::persistence(format!("invalid collection name {name:?}")))
    }
}

/// `SQLite` backed document store. Each collection is a table of JSON bodies
/// keyed by an autoincrement id and a unique document key.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Opens (creating if needed) the database at `database_url`.
    ///
    /// # Arguments
    ///
    /// * `database_url` - `SQLite` URL (e.g., `<sqlite://data/short_straddle.db>`)
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        if let Some(file_path) = database_url.strip_prefix("sqlite://") {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StrategyError::persistence(format!("{}: {e}", parent.display())))?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    /// Creates an in-memory database. A single connection keeps every query
    /// on the same database.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn ensure_collection(&self, name: &str) -> Result<()> {
        let table = checked_collection(name)?;
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_key TEXT NOT NULL UNIQUE,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(collection = table, "Collection ready");
        Ok(())
    }

    async fn read(&self, filter: &DocumentFilter, name: &str) -> Result<Option<Document>> {
        let table = checked_collection(name)?;
        let row = match filter {
            DocumentFilter::ById(id) => {
                sqlx::query_as::<_, (i64, String, String)>(&format!(
                    "SELECT id, doc_key, body FROM {table} WHERE id = ?1"
                ))
                .bind(*id)
                .fetch_optional(&self.pool)
                .await
            }
            DocumentFilter::ByKey(key) => {
                sqlx::query_as::<_, (i64, String, String)>(&format!(
                    "SELECT id, doc_key, body FROM {table} WHERE doc_key = ?1"
                ))
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        row.map(|(id, key, body)| {
            Ok::<_, StrategyError>(Document {
                id,
                key,
                body: serde_json::from_str(&body)?,
            })
        })
        .transpose()
    }

    async fn insert(&self, key: &str, body: &serde_json::Value, name: &str) -> Result<DocumentId> {
        let table = checked_collection(name)?;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(&format!(
            "INSERT INTO {table} (doc_key, body, updated_at) VALUES (?1, ?2, ?3)"
        ))
        .bind(key)
        .bind(body.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, filter: &DocumentFilter, body: &serde_json::Value, name: &str) -> Result<()> {
        let table = checked_collection(name)?;
        let now = chrono::Utc::now().timestamp();

        let result = match filter {
            DocumentFilter::ById(id) => {
                sqlx::query(&format!(
                    "UPDATE {table} SET body = ?1, updated_at = ?2 WHERE id = ?3"
                ))
                .bind(body.to_string())
                .bind(now)
                .bind(*id)
                .execute(&self.pool)
                .await
            }
            DocumentFilter::ByKey(key) => {
                sqlx::query(&format!(
                    "UPDATE {table} SET body = ?1, updated_at = ?2 WHERE doc_key = ?3"
                ))
                .bind(body.to_string())
                .bind(now)
                .bind(key.as_str())
                .execute(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StrategyError::persistence(format!(
                "no document in {table} matches {filter:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_read_update_roundtrip() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store.ensure_collection("twelve_thirty").await.unwrap();
        // Second call is a no-op.
        store.ensure_collection("twelve_thirty").await.unwrap();

        let id = store
            .insert("2026-10-19", &json!({"legs": 0}), "twelve_thirty")
            .await
            .unwrap();

        let by_key = store
            .read(&DocumentFilter::ByKey("2026-10-19".to_string()), "twelve_thirty")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, id);
        assert_eq!(by_key.body, json!({"legs": 0}));

        store
            .update(&DocumentFilter::ById(id), &json!({"legs": 2}), "twelve_thirty")
            .await
            .unwrap();
        let by_id = store
            .read(&DocumentFilter::ById(id), "twelve_thirty")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.key, "2026-10-19");
        assert_eq!(by_id.body, json!({"legs": 2}));
    }

    #[tokio::test]
    async fn test_read_missing_document_is_none() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store.ensure_collection("twelve_thirty").await.unwrap();
        let doc = store
            .read(&DocumentFilter::ByKey("1999-01-01".to_string()), "twelve_thirty")
            .await
            .unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_update_without_match_fails() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store.ensure_collection("twelve_thirty").await.unwrap();
        let err = store
            .update(&DocumentFilter::ById(42), &json!({}), "twelve_thirty")
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_rejected() {
        let store = SqliteDocumentStore::in_memory().await.unwrap();
        store.ensure_collection("twelve_thirty").await.unwrap();
        store.insert("2026-10-19", &json!({}), "twelve_thirty").await.unwrap();
        let err = store
            .insert("2026-10-19", &json!({}), "twelve_thirty")
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::Persistence(_)));
    }

    #[test]
    fn test_collection_names_are_identifiers() {
        assert!(checked_collection("twelve_thirty").is_ok());
        assert!(checked_collection("t1").is_ok());
        assert!(checked_collection("").is_err());
        assert!(checked_collection("1abc").is_err());
        assert!(checked_collection("x; DROP TABLE y").is_err());
    }
}
