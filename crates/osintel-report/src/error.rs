use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported export format: {format} (supported: json, html, pdf)")]
    UnsupportedFormat { format: String },
}
