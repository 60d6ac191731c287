use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const KATOTTG_URL: &str =
    "https://mtu.gov.ua/files/for_investors/Kodyfikator_terytorialnykh_odynyts.csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub import: ImportConfig,
    pub store: StoreConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// A local copy of the register. Takes precedence over `url`.
    pub path: Option<PathBuf>,
    pub delimiter: char,
    pub has_headers: bool,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub chunk_size: usize,
    pub language: String,
    pub country_name: String,
    pub country_code: String,
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub run_ttl_days: u64,
    pub cleanup_interval_hours: u64,
    pub remove_downloaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: KATOTTG_URL.to_string(),
            path: None,
            delimiter: ';',
            has_headers: true,
            timeout_seconds: 120,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            language: "uk".to_string(),
            country_name: "Україна".to_string(),
            country_code: "UA".to_string(),
            work_dir: PathBuf::from("./data/work"),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/geo.redb"),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            run_ttl_days: 30,
            cleanup_interval_hours: 24,
            remove_downloaded: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> crate::utils::errors::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::utils::errors::ImportError::ConfigError(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::utils::errors::Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::utils::errors::ImportError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::utils::errors::Result<()> {
        if self.import.chunk_size == 0 {
            return Err(crate::utils::errors::ImportError::ConfigError(
                "import.chunk_size must be greater than zero".to_string(),
            ));
        }
        if !self.source.delimiter.is_ascii() {
            return Err(crate::utils::errors::ImportError::ConfigError(format!(
                "source.delimiter must be a single ASCII character, got {:?}",
                self.source.delimiter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
[import]
chunk_size = 100
language = "en"

[store]
db_path = "/tmp/geo.redb"
"#,
        )
        .unwrap();

        assert_eq!(config.import.chunk_size, 100);
        assert_eq!(config.import.language, "en");
        assert_eq!(config.import.country_code, "UA");
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/geo.redb"));
        assert_eq!(config.source.delimiter, ';');
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = AppConfig::from_toml("[import]\nchunk_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AppConfig::load_from_file("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, crate::utils::errors::ImportError::ConfigError(_)));
    }
}
