use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to read secrets file {path}: {source}")]
    Secrets {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook rejected notification (code {code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("failed to persist notification lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode notification lock: {0}")]
    Encode(#[from] serde_json::Error),
}
