//! Durable per-day checkpoint of the four strategy legs.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use short_straddle_core::{DocumentFilter, DocumentStore, Position, Result, StrategyError};

/// Version written into every snapshot document.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Everything needed to resume a trading day after a restart.
///
/// An empty slot (no trading symbol) means that leg has not been placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub schema_version: u32,
    pub trading_day: NaiveDate,
    pub sell_call: Position,
    pub sell_put: Position,
    pub stop_loss_call: Position,
    pub stop_loss_put: Position,
    /// Closing orders already submitted at the exit window.
    #[serde(default)]
    pub closing_legs: Vec<Position>,
    /// Set once the day's cycle has been closed out.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StrategySnapshot {
    #[must_use]
    pub fn new(trading_day: NaiveDate) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            trading_day,
            sell_call: Position::default(),
            sell_put: Position::default(),
            stop_loss_call: Position::default(),
            stop_loss_put: Position::default(),
            closing_legs: Vec::new(),
            completed_at: None,
            updated_at: None,
        }
    }

    /// Resets all four slots and the closing orders to empty.
    pub fn clear(&mut self) {
        self.closing_legs.clear();
        self.sell_call = Position::default();
        self.sell_put = Position::default();
        self.stop_loss_call = Position::default();
        self.stop_loss_put = Position::default();
    }

    /// True when a closing order for `sell_leg` was already submitted.
    #[must_use]
    pub fn is_flattened(&self, sell_leg: &Position) -> bool {
        self.closing_legs
            .iter()
            .any(|closing| closing.trading_symbol == sell_leg.trading_symbol)
    }

    /// Number of slots holding a placed leg.
    #[must_use]
    pub fn placed_legs(&self) -> usize {
        [&self.sell_call, &self.sell_put, &self.stop_loss_call, &self.stop_loss_put]
            .iter()
            .filter(|leg| leg.is_placed())
            .count()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Decodes a stored body, rejecting unknown schema versions.
    ///
    /// # Errors
    ///
    /// Returns `StrategyError::Persistence` for a missing or unsupported
    /// version, or a body that does not match the schema.
    pub fn from_document(body: serde_json::Value) -> Result<Self> {
        let version = body
            .get("schema_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| StrategyError::persistence("snapshot has no schema_version"))?;
        if version != u64::from(SNAPSHOT_SCHEMA_VERSION) {
            return Err(StrategyError::persistence(format!(
                "unsupported snapshot schema version {version}"
            )));
        }
        Ok(serde_json::from_value(body)?)
    }
}

/// Where a loaded snapshot lives, used to write it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    pub collection: String,
    pub filter: DocumentFilter,
}

/// Loads and saves one snapshot per trading day in a named collection.
pub struct SnapshotRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl SnapshotRepository {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the snapshot for `day`, inserting an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails or the stored document
    /// cannot be decoded.
    pub async fn load_or_create(&self, day: NaiveDate) -> Result<(StrategySnapshot, SnapshotHandle)> {
        self.store.ensure_collection(&self.collection).await?;

        let key = day.to_string();
        let existing = self
            .store
            .read(&DocumentFilter::ByKey(key.clone()), &self.collection)
            .await?;

        let (snapshot, id) = match existing {
            Some(document) => {
                let snapshot = StrategySnapshot::from_document(document.body)?;
                if snapshot.trading_day != day {
                    return Err(StrategyError::persistence(format!(
                        "document {key} holds trading day {}",
                        snapshot.trading_day
                    )));
                }
                info!(
                    collection = %self.collection,
                    day = %day,
                    placed = snapshot.placed_legs(),
                    "Loaded snapshot"
                );
                (snapshot, document.id)
            }
            None => {
                let snapshot = StrategySnapshot::new(day);
                let body = serde_json::to_value(&snapshot)?;
                let id = self.store.insert(&key, &body, &self.collection).await?;
                info!(collection = %self.collection, day = %day, id, "Created snapshot");
                (snapshot, id)
            }
        };

        let handle = SnapshotHandle {
            collection: self.collection.clone(),
            filter: DocumentFilter::ById(id),
        };
        Ok((snapshot, handle))
    }

    /// Replaces the stored snapshot, stamping it with `now`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the write fails.
    pub async fn save(
        &self,
        handle: &SnapshotHandle,
        snapshot: &mut StrategySnapshot,
        now: DateTime<Utc>,
    ) -> Result<()> {
        snapshot.updated_at = Some(now);
        let body = serde_json::to_value(&*snapshot)?;
        self.store.update(&handle.filter, &body, &handle.collection).await?;
        debug!(collection = %handle.collection, placed = snapshot.placed_legs(), "Saved snapshot");
        Ok(())
    }

    /// Reads the snapshot for `day` without creating one.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails or the document cannot
    /// be decoded.
    pub async fn find(&self, day: NaiveDate) -> Result<Option<StrategySnapshot>> {
        self.store.ensure_collection(&self.collection).await?;
        self.store
            .read(&DocumentFilter::ByKey(day.to_string()), &self.collection)
            .await?
            .map(|document| StrategySnapshot::from_document(document.body))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use short_straddle_core::OrderStatus;
    use short_straddle_data::InMemoryDocumentStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn repository() -> (Arc<InMemoryDocumentStore>, SnapshotRepository) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = SnapshotRepository::new(store.clone(), "twelve_thirty");
        (store, repo)
    }

    #[tokio::test]
    async fn test_first_load_creates_empty_snapshot() {
        let (store, repo) = repository();
        let (snapshot, handle) = repo.load_or_create(day()).await.unwrap();

        assert_eq!(snapshot, StrategySnapshot::new(day()));
        assert_eq!(snapshot.placed_legs(), 0);
        assert_eq!(handle.collection, "twelve_thirty");
        assert_eq!(store.documents("twelve_thirty").len(), 1);
    }

    #[tokio::test]
    async fn test_save_then_reload_restores_legs() {
        let (store, repo) = repository();
        let (mut snapshot, handle) = repo.load_or_create(day()).await.unwrap();
        snapshot.sell_call = Position {
            trading_symbol: "NIFTY26O2024850CE".to_string(),
            average_price: dec!(101.5),
            order_id: Some("A1".to_string()),
            status: Some(OrderStatus::Complete),
            ..Position::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap();
        repo.save(&handle, &mut snapshot, now).await.unwrap();

        let (reloaded, reloaded_handle) = repo.load_or_create(day()).await.unwrap();
        assert_eq!(reloaded, snapshot);
        assert_eq!(reloaded.updated_at, Some(now));
        assert_eq!(reloaded_handle, handle);
        assert_eq!(store.documents("twelve_thirty").len(), 1);
    }

    #[tokio::test]
    async fn test_days_are_kept_apart() {
        let (_, repo) = repository();
        let (mut today, handle) = repo.load_or_create(day()).await.unwrap();
        today.sell_put.trading_symbol = "NIFTY26O2024850PE".to_string();
        repo.save(&handle, &mut today, Utc::now()).await.unwrap();

        let tomorrow = day().succ_opt().unwrap();
        let (next, _) = repo.load_or_create(tomorrow).await.unwrap();
        assert_eq!(next.placed_legs(), 0);
        assert!(repo.find(day()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_missing_day() {
        let (_, repo) = repository();
        assert!(repo.find(day()).await.unwrap().is_none());
    }

    #[test]
    fn test_unknown_schema_version_is_rejected() {
        let mut body = serde_json::to_value(StrategySnapshot::new(day())).unwrap();
        body["schema_version"] = serde_json::json!(2);
        assert!(matches!(
            StrategySnapshot::from_document(body),
            Err(StrategyError::Persistence(_))
        ));

        let unversioned = serde_json::json!({ "sell_call": {} });
        assert!(StrategySnapshot::from_document(unversioned).is_err());
    }

    #[test]
    fn test_clear_empties_every_slot() {
        let mut snapshot = StrategySnapshot::new(day());
        snapshot.sell_call.trading_symbol = "A".to_string();
        snapshot.stop_loss_put.trading_symbol = "B".to_string();
        snapshot.closing_legs.push(snapshot.sell_call.clone());
        assert_eq!(snapshot.placed_legs(), 2);
        assert!(snapshot.is_flattened(&snapshot.sell_call));
        snapshot.clear();
        assert_eq!(snapshot.placed_legs(), 0);
        assert!(snapshot.closing_legs.is_empty());
    }

    #[test]
    fn test_documents_without_closing_legs_still_decode() {
        let mut body = serde_json::to_value(StrategySnapshot::new(day())).unwrap();
        body.as_object_mut().unwrap().remove("closing_legs");
        let snapshot = StrategySnapshot::from_document(body).unwrap();
        assert!(snapshot.closing_legs.is_empty());
    }
}
