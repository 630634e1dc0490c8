use importer::{CommitError, DecodeError, ImportError, ReferenceFetchError, ValidationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write template: {0}")]
    Template(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base_url: {0}")]
    BaseUrl(String),
    #[error("invalid {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },
    #[error("nothing is staged, run `moneysmart stage` first")]
    NothingStaged,
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Import(err.into())
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        Self::Import(err.into())
    }
}

impl From<ReferenceFetchError> for AppError {
    fn from(err: ReferenceFetchError) -> Self {
        Self::Import(err.into())
    }
}

impl From<CommitError> for AppError {
    fn from(err: CommitError) -> Self {
        Self::Import(err.into())
    }
}
