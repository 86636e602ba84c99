use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid collector config: {0}")]
    InvalidConfig(String),

    #[error("unsupported source type: {source_type}. Available types: {available}")]
    UnsupportedSourceType {
        source_type: String,
        available: String,
    },
}
