// Error handling framework
//
// Scan and publish errors are contained per item / per surface and logged;
// only configuration errors halt the process (enforced at startup in the
// binary, see Settings::validate).

use thiserror::Error;

/// Content scanning errors
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input directory not found: {0}")]
    InputDirMissing(String),

    #[error("Failed to read directory {path}: {reason}")]
    DirUnreadable { path: String, reason: String },

    #[error("No video file in folder: {0}")]
    VideoMissing(String),

    #[error("Video unreadable in folder {folder}: {reason}")]
    VideoUnreadable { folder: String, reason: String },

    #[error("Failed to read content file {path}: {reason}")]
    ContentUnreadable { path: String, reason: String },

    #[error("Invalid content JSON in {path}: {reason}")]
    InvalidContentJson { path: String, reason: String },

    #[error("Duplicate folder id after normalization: {0}")]
    DuplicateFolderId(String),

    #[error("Empty folder id for path: {0}")]
    EmptyFolderId(String),
}

/// Ledger (sqlite) errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Ledger migration failed: {0}")]
    MigrationFailed(String),

    #[error("Ledger query failed: {0}")]
    QueryFailed(String),

    #[error("Ledger health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Invalid status value in ledger: {0}")]
    InvalidStatus(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::QueryFailed(e.to_string())
    }
}

/// Publishing errors for a single surface attempt
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Graph API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected Graph API response: {0}")]
    UnexpectedResponse(String),

    #[error("Media container {container_id} failed processing: {detail}")]
    ContainerError {
        container_id: String,
        detail: String,
    },

    #[error("Media container {container_id} not finished after {attempts} checks")]
    ContainerTimeout {
        container_id: String,
        attempts: u32,
    },

    #[error("Could not resolve a public URL for video: {0}")]
    MediaUrl(String),
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        PublishError::Http(e.to_string())
    }
}

/// Duration probe errors
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("ffprobe failed to start: {0}")]
    SpawnFailed(String),

    #[error("ffprobe exited with an error for {path}: {stderr}")]
    ProbeFailed { path: String, stderr: String },

    #[error("Unparseable duration for {path}: {raw}")]
    UnparseableDuration { path: String, raw: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_messages_include_context() {
        let err = PublishError::Api {
            status: 400,
            body: "(#100) Invalid parameter".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("Invalid parameter"));
    }

    #[test]
    fn test_ledger_error_from_sqlx() {
        let err: LedgerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, LedgerError::QueryFailed(_)));
    }
}
