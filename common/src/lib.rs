// common/src/lib.rs
pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod logging;
pub mod models;

// Re-export commonly used items
pub use config::Config;
pub use db::{ActivityStore, SqliteStore, TimescaleStore};
pub use error::{ConfigError, MappingError, SourceError, StoreError, StoreResult};
pub use github::{ActivitySource, GitHubClient};
pub use models::*;
