use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound notification failed. Always caught at the pipeline boundary,
    /// never mapped to an HTTP response.
    #[error("notification: {0}")]
    Notification(String),
}
