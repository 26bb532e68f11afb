use relay_logging::relay_debug;

use crate::config::SessionConfig;
use crate::effect::Effect;
use crate::poller::{JobPoller, PollPhase};
use crate::presenter::present;
use crate::staging::StagingController;
use crate::submission::SubmissionId;
use crate::view_model::{AppViewModel, FileRowView, PageRowView};
use crate::validate::format_bytes;

pub type NoticeId = u64;
pub type DocumentToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient message that dismisses itself after the configured delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub level: NoticeLevel,
    pub text: String,
}

/// One staging session: a tool page from mount to unmount.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    config: SessionConfig,
    staging: StagingController,
    poller: JobPoller,
    next_submission: SubmissionId,
    in_flight: Option<SubmissionId>,
    upload_percent: u8,
    next_document_token: DocumentToken,
    pending_document: Option<DocumentToken>,
    next_notice_id: NoticeId,
    notices: Vec<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            staging: StagingController::new(config.tool.clone()),
            poller: JobPoller::new(config.poll),
            config,
            next_submission: 1,
            in_flight: None,
            upload_percent: 0,
            next_document_token: 1,
            pending_document: None,
            next_notice_id: 1,
            notices: Vec::new(),
            dirty: false,
        }
    }

    pub fn staging(&self) -> &StagingController {
        &self.staging
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn view(&self) -> AppViewModel {
        let files = self
            .staging
            .files()
            .items()
            .iter()
            .enumerate()
            .map(|(position, file)| FileRowView {
                position,
                name: file.name.clone(),
                size_label: format_bytes(file.size_bytes),
            })
            .collect();
        let pages = self
            .staging
            .pages()
            .pages()
            .iter()
            .map(|page| PageRowView {
                number: page.0,
                selected: self.staging.pages().is_selected(page.0),
            })
            .collect();

        AppViewModel {
            tool: self.config.tool.slug.clone(),
            files,
            pages,
            snapshot: self.staging.snapshot(),
            inspecting_document: self.pending_document.is_some(),
            upload_percent: self.in_flight.map(|_| self.upload_percent),
            phase: self.poller.phase(),
            job_progress: self.poller.progress(),
            result: present(self.poller.state()),
            notices: self.notices.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn staging_mut(&mut self) -> &mut StagingController {
        &mut self.staging
    }

    pub(crate) fn poller_mut(&mut self) -> &mut JobPoller {
        &mut self.poller
    }

    pub(crate) fn in_flight(&self) -> Option<SubmissionId> {
        self.in_flight
    }

    pub(crate) fn begin_submission(&mut self) -> SubmissionId {
        let id = self.next_submission;
        self.next_submission += 1;
        self.in_flight = Some(id);
        self.upload_percent = 0;
        id
    }

    pub(crate) fn finish_submission(&mut self) {
        self.in_flight = None;
        self.upload_percent = 0;
    }

    /// Raises the upload percentage; lower or repeated values are ignored.
    pub(crate) fn record_upload_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent <= self.upload_percent {
            return false;
        }
        self.upload_percent = percent;
        true
    }

    pub(crate) fn next_document(&mut self) -> DocumentToken {
        let token = self.next_document_token;
        self.next_document_token += 1;
        self.pending_document = Some(token);
        token
    }

    pub(crate) fn pending_document(&self) -> Option<DocumentToken> {
        self.pending_document
    }

    pub(crate) fn clear_pending_document(&mut self) {
        self.pending_document = None;
    }

    /// Queues a notice and returns the effect that will dismiss it.
    pub(crate) fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) -> Effect {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        let text = text.into();
        relay_debug!("Notice {} ({:?}): {}", id, level, text);
        self.notices.push(Notice { id, level, text });
        self.dirty = true;
        Effect::ScheduleNoticeDismiss {
            id,
            after: self.config.notices.dismiss_after,
        }
    }

    pub(crate) fn dismiss_notice(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        before != self.notices.len()
    }

    pub(crate) fn clear_notices(&mut self) {
        self.notices.clear();
    }

    pub(crate) fn job_active(&self) -> bool {
        self.in_flight.is_some() || self.poller.phase() != PollPhase::Idle
    }
}
