use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] redb::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: u64, message: String },

    #[error("Download failed with status {status}: {url}")]
    DownloadStatus { url: String, status: u16 },

    #[error("Unknown code seeker: {0}")]
    UnknownSeeker(String),

    #[error("Invalid {seeker} code: {value}")]
    InvalidCode { seeker: String, value: String },

    #[error("Parent division {parent} not found for {code}")]
    MissingParent { code: String, parent: String },

    #[error("Division not found: {0}")]
    DivisionNotFound(String),

    #[error("Import run not found: {0}")]
    RunNotFound(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;

macro_rules! redb_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ImportError {
                fn from(e: $source) -> Self {
                    ImportError::DatabaseError(e.into())
                }
            }
        )*
    };
}

redb_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
