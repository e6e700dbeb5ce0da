//! AI service error types

use std::fmt;
use thiserror::Error;

/// AI service error with classification
#[derive(Debug, Error)]
#[error("{op} failed: {message}")]
pub struct AiError {
    pub op: AiOp,
    pub kind: AiErrorKind,
    pub message: String,
}

impl AiError {
    pub fn new(op: AiOp, kind: AiErrorKind, message: impl Into<String>) -> Self {
        Self {
            op,
            kind,
            message: message.into(),
        }
    }

    pub fn upload(kind: AiErrorKind, message: impl Into<String>) -> Self {
        Self::new(AiOp::Upload, kind, message)
    }

    pub fn inference(kind: AiErrorKind, message: impl Into<String>) -> Self {
        Self::new(AiOp::Inference, kind, message)
    }
}

/// Which semantic operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiOp {
    /// Staging or uploading a document
    Upload,
    /// A model call against an uploaded document
    Inference,
}

impl fmt::Display for AiOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiOp::Upload => write!(f, "upload"),
            AiOp::Inference => write!(f, "inference"),
        }
    }
}

/// Transport-level error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited or quota exhausted (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request, e.g. rejected content or invalid handle (400, 404)
    InvalidRequest,
    /// Unknown error
    Unknown,
}
