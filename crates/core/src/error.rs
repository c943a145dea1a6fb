#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Request bodies are flat JSON objects; anything else cannot be sent.
    #[error("Payload must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
