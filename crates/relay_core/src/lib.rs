//! Relay core: pure staging and job-tracking state machines.
//!
//! Nothing in this crate performs IO. [`update`] applies a [`Msg`] to an
//! [`AppState`] and returns the [`Effect`]s an adapter has to execute; the
//! adapter reports back with further messages.
mod config;
mod effect;
mod msg;
mod poller;
mod presenter;
mod selection;
mod staging;
mod state;
mod submission;
mod update;
mod validate;
mod view_model;

pub use config::{
    builtin_tools, find_tool, normalize_extension, NoticeConfig, PollConfig, SessionConfig,
    ToolConfig, ToolMode, DEFAULT_MAX_BYTES,
};
pub use effect::Effect;
pub use msg::Msg;
pub use poller::{
    JobPoller, PollEffect, PollGeneration, PollPhase, PollState, StatusReport,
    FAILED_FALLBACK_MESSAGE, PENDING_PROGRESS, PROCESSING_PROGRESS, TIMED_OUT_MESSAGE,
};
pub use presenter::{compression_ratio, present, ResultView};
pub use selection::{Page, PageStore, SelectionError, SelectionStore, Staged, StagedFile};
pub use staging::{BatchReport, StagingController, StagingLock, StagingSnapshot};
pub use state::{AppState, DocumentToken, Notice, NoticeId, NoticeLevel};
pub use submission::{
    build_payload, JobHandle, JobMetrics, JobResult, JobTicket, PayloadPart, SubmissionId,
    SubmissionPayload,
};
pub use update::update;
pub use validate::{file_extension, format_bytes, validate, FileCandidate, Rejection};
pub use view_model::{AppViewModel, FileRowView, PageRowView};
