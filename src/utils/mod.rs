pub mod config;
pub mod errors;

pub use config::{
    AppConfig, CleanupConfig, ImportConfig, LoggingConfig, SourceConfig, StoreConfig,
};
pub use errors::{ImportError, Result};

pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
