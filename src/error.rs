use crate::validator::FieldError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed JSON input: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Normalization failed: {0}")]
    Normalization(String),

    #[error("Schema validation failed with {} error(s): {}", .errors.len(), summarize(.errors))]
    Validation { errors: Vec<FieldError> },

    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid pipeline configuration: {0}")]
    Config(String),

    #[error("Analysis backend error: {0}")]
    Analysis(String),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PipelineError>;
