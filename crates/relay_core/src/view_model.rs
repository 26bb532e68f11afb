use crate::poller::PollPhase;
use crate::presenter::ResultView;
use crate::staging::StagingSnapshot;
use crate::state::Notice;

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub tool: String,
    pub files: Vec<FileRowView>,
    pub pages: Vec<PageRowView>,
    pub snapshot: StagingSnapshot,
    pub inspecting_document: bool,
    /// `Some` while a submission is in flight.
    pub upload_percent: Option<u8>,
    pub phase: PollPhase,
    pub job_progress: u8,
    pub result: Option<ResultView>,
    pub notices: Vec<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub position: usize,
    pub name: String,
    pub size_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRowView {
    pub number: u32,
    pub selected: bool,
}
