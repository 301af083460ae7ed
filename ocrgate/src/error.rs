use thiserror::Error;

/// Longest remote body excerpt kept in error messages and logs.
pub const MAX_BODY_EXCERPT: usize = 512;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remote OCR service returned status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Remote OCR service still failing after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out after {0} seconds waiting for the read operation result")]
    PollTimeout(u64),

    #[error("Read operation failed: {0}")]
    RemoteOperationFailed(String),

    #[error("OCR request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Copyable classification of an [`OcrError`], carried by failed outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Configuration,
    Remote,
    RetriesExhausted,
    Protocol,
    PollTimeout,
    RemoteOperationFailed,
    Cancelled,
    Internal,
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::InvalidInput(_) => ErrorKind::InvalidInput,
            OcrError::Configuration(_) => ErrorKind::Configuration,
            OcrError::Remote { .. } => ErrorKind::Remote,
            OcrError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            OcrError::Protocol(_) => ErrorKind::Protocol,
            OcrError::PollTimeout(_) => ErrorKind::PollTimeout,
            OcrError::RemoteOperationFailed(_) => ErrorKind::RemoteOperationFailed,
            OcrError::Cancelled => ErrorKind::Cancelled,
            OcrError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn remote(status: u16, body: &str) -> Self {
        OcrError::Remote {
            status,
            body: excerpt(body),
        }
    }
}

/// Truncate an untrusted remote body to [`MAX_BODY_EXCERPT`] characters.
pub fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(MAX_BODY_EXCERPT).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
