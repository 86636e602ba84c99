use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference response is not valid JSON: {0}")]
    Deserialize(#[from] serde_json::Error),
}
