use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Already queued: {0}")]
    Duplicate(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Metadata resolver failed: {0}")]
    Resolver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Stable tag reported to callers alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Duplicate(_) => "duplicate",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidItem(_) => "invalid_item",
            AppError::Resolver(_) | AppError::Http(_) => "resolver_failure",
            AppError::Config(_) | AppError::Toml(_) => "config",
            AppError::Database(_) | AppError::Connection(_) => "store",
            AppError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
