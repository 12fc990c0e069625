pub mod config;
pub mod config_loader;
pub mod error;
pub mod position;
pub mod traits;

pub use config::{AppConfig, DatabaseConfig, PaperConfig, RawSetting, RetryConfig, StrategyConfig, WindowConfig};
pub use config_loader::ConfigLoader;
pub use error::{Result, StrategyError};
pub use position::{OptionType, OrderStatus, OrderType, Position, ProductType, TransactionType};
pub use traits::{Broker, Document, DocumentFilter, DocumentId, DocumentStore, ExpiryBucket, SymbolResolver};
