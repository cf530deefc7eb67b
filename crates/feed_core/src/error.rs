//! Error taxonomy surfaced by the feed orchestrators.

use thiserror::Error;

use crate::transport::{ApiFailure, ErrorBody};

pub const VALIDATION_MESSAGE: &str = "Title and content cannot be empty.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOperation {
    FetchPosts,
    CreatePost,
}

impl FeedOperation {
    fn transport_message(self) -> &'static str {
        match self {
            Self::FetchPosts => "Failed to fetch posts.",
            Self::CreatePost => "Failed to create post.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Empty title or content; raised before any request is sent.
    #[error("{}", VALIDATION_MESSAGE)]
    Validation,
    /// The request never produced a usable response.
    #[error("{message}")]
    Transport { message: String },
    /// Non-2xx response from the content API.
    #[error("{message}")]
    Server { status: u16, message: String },
}

impl FeedError {
    pub fn from_failure(operation: FeedOperation, failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::Transport(_) => Self::Transport {
                message: operation.transport_message().to_string(),
            },
            ApiFailure::Status { status, body } => {
                let message = match body {
                    ErrorBody::Message(message) => message,
                    ErrorBody::Unstructured => format!("request failed with status {status}"),
                };
                Self::Server { status, message }
            }
        }
    }

    /// Generic failure for `operation`. Callers log the underlying cause.
    pub fn transport(operation: FeedOperation) -> Self {
        Self::Transport {
            message: operation.transport_message().to_string(),
        }
    }

    /// Text recorded as the controller's last error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation)
    }
}
