use crate::poller::{PollGeneration, StatusReport};
use crate::state::{DocumentToken, NoticeId};
use crate::submission::{JobHandle, SubmissionId};
use crate::validate::FileCandidate;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked or dropped files.
    FilesChosen(Vec<FileCandidate>),
    /// Page count of the staged document, or why it could not be read.
    DocumentInspected {
        token: DocumentToken,
        result: Result<u32, String>,
    },
    /// User removed the file at `position`.
    RemoveFile { position: usize },
    /// User dragged the file at `from` onto `to`.
    ReorderFile { from: usize, to: usize },
    TogglePage(u32),
    SelectAllPages,
    ClearPageSelection,
    /// User clicked the submit action.
    SubmitClicked { extra_fields: Vec<(String, String)> },
    /// Upload progress for a submission, in percent.
    UploadProgress { submission: SubmissionId, percent: u8 },
    SubmissionSucceeded {
        submission: SubmissionId,
        handle: JobHandle,
    },
    SubmissionFailed {
        submission: SubmissionId,
        message: String,
    },
    /// Interval timer fired.
    PollTick { generation: PollGeneration },
    StatusReceived {
        generation: PollGeneration,
        report: StatusReport,
    },
    /// A status query could not be completed (network, bad body).
    StatusQueryFailed {
        generation: PollGeneration,
        message: String,
    },
    /// A transient notice reached its display deadline.
    NoticeExpired(NoticeId),
    /// User asked to start over.
    StartOver,
}
