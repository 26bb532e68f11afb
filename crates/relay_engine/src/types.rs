use std::fmt;
use std::path::PathBuf;

use relay_core::{DocumentToken, JobHandle, NoticeId, PollGeneration, StatusReport, SubmissionId};

/// Everything the engine reports back to the driver loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    UploadProgress {
        submission: SubmissionId,
        percent: u8,
    },
    Submitted {
        submission: SubmissionId,
        result: Result<JobHandle, SubmitError>,
    },
    PollTick {
        generation: PollGeneration,
    },
    StatusQueried {
        generation: PollGeneration,
        result: Result<StatusReport, StatusError>,
    },
    DocumentInspected {
        token: DocumentToken,
        result: Result<u32, String>,
    },
    NoticeExpired(NoticeId),
    Downloaded {
        url: String,
        result: Result<PathBuf, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SubmitError {
    pub kind: FailureKind,
    /// User-facing text; server supplied when the response carried one.
    pub message: String,
}

impl SubmitError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StatusError {
    pub kind: FailureKind,
    pub message: String,
}

impl StatusError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Io,
    /// Body could not be understood.
    Protocol,
    UnknownStatus(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Protocol => write!(f, "unexpected response"),
            FailureKind::UnknownStatus(status) => write!(f, "unknown job status {status:?}"),
        }
    }
}
