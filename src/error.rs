use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Cannot convert {column}='{value}' to integer ({file}, line {line})")]
    Coercion {
        file: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Total deaths overflowed while summing year {0}")]
    Overflow(i32),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
