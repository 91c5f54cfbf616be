use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementParserError {
    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    #[error("Invalid pattern '{pattern}' for canonical key '{key}': {source}")]
    InvalidPattern {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unsupported input document: {0}")]
    InputFormat(String),

    #[error("Invalid amount token: {0}")]
    InvalidAmount(String),

    #[error("Statement not found: {0}")]
    NotFound(u64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementParserError>;
