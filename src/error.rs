use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Recoverable failures of store operations. None of these are fatal; the
/// assistant reports each one through the notification sink as well.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error("document {0} not found")]
    DocumentNotFound(Uuid),
    #[error("unknown data source: {0}")]
    InvalidDataSource(String),
    #[error("an upload is already in progress")]
    UploadInProgress,
    #[error("a reply is already pending")]
    ReplyPending,
    #[error("message is empty")]
    EmptyMessage,
    #[error("no files selected")]
    NoFiles,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AssistantError {
    /// Short heading used when the error is surfaced as a notification.
    pub fn title(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "Session not found",
            Self::DocumentNotFound(_) => "Document not found",
            Self::InvalidDataSource(_) => "Unknown data source",
            Self::UploadInProgress => "Upload in progress",
            Self::ReplyPending => "Still thinking",
            Self::EmptyMessage => "Empty message",
            Self::NoFiles => "No files selected",
            Self::Internal(_) => "Something went wrong",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) | Self::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidDataSource(_) | Self::EmptyMessage | Self::NoFiles => {
                StatusCode::BAD_REQUEST
            }
            Self::UploadInProgress | Self::ReplyPending => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
