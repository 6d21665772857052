use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgeingError {
    #[error("Required columns not found in source table: {}", missing.join(", "))]
    MissingRequiredColumns { missing: Vec<String> },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Invalid model group mapping: {0}")]
    InvalidModelGroupMapping(String),

    #[error("No snapshot has been published yet")]
    NoSnapshot,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgeingError>;
