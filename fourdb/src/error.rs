use thiserror::Error;

#[derive(Error, Debug)]
pub enum FourDbError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Range error: {0}")]
    Range(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Collection not found: {collection}")]
    NotFound { collection: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl FourDbError {
    /// True for failures of the backing storage itself (read, parse, write).
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            FourDbError::Io(_) | FourDbError::Json(_) | FourDbError::Sqlite(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FourDbError>;
