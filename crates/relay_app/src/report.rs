use std::collections::HashSet;
use std::path::Path;

use chrono::Local;
use relay_core::{AppViewModel, NoticeId, NoticeLevel, PollPhase, ResultView};

/// Prints view changes as timestamped terminal lines.
#[derive(Default)]
pub struct Reporter {
    seen_notices: HashSet<NoticeId>,
    last_status: Option<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&mut self, view: &AppViewModel) {
        for line in self.describe(view) {
            println!("[{}] {}", Local::now().format("%H:%M:%S"), line);
        }
    }

    /// Lines for whatever changed since the previous call.
    pub fn describe(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        for notice in &view.notices {
            if self.seen_notices.insert(notice.id) {
                let tag = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Error => "error",
                };
                lines.push(format!("{tag}: {}", notice.text));
            }
        }

        let status = status_line(view);
        if self.last_status.as_deref() != Some(status.as_str()) {
            lines.push(status.clone());
            self.last_status = Some(status);
        }
        lines
    }
}

fn status_line(view: &AppViewModel) -> String {
    if let Some(percent) = view.upload_percent {
        return format!("{} ({percent}% uploaded)", view.snapshot.action_label);
    }
    match view.phase {
        PollPhase::Polling => format!("Processing ({}%)", view.job_progress),
        PollPhase::Idle if view.inspecting_document => "Reading document…".to_string(),
        PollPhase::Idle => format!(
            "{}: {} staged, {}",
            view.tool, view.snapshot.count, view.snapshot.action_label
        ),
        PollPhase::Completed | PollPhase::Failed | PollPhase::TimedOut => "Job finished".to_string(),
    }
}

/// Final summary of a terminal job.
pub fn outcome_lines(view: &AppViewModel, saved: Option<&Path>) -> Vec<String> {
    match &view.result {
        Some(ResultView::Success {
            download_url,
            summary,
            ..
        }) => {
            let mut lines = vec!["Done.".to_string()];
            lines.extend(summary.iter().map(|line| format!("  {line}")));
            match saved {
                Some(path) => lines.push(format!("  Saved to {}", path.display())),
                None => lines.push(format!("  Download: {download_url}")),
            }
            lines
        }
        Some(ResultView::Failure { message }) => vec![format!("Failed: {message}")],
        Some(ResultView::TimedOut { message }) => vec![format!("Timed out: {message}")],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_core::{
        builtin_tools, find_tool, update, AppState, FileCandidate, JobHandle, JobMetrics,
        JobResult, Msg, SessionConfig,
    };
    use std::path::PathBuf;

    fn merged_session() -> AppState {
        let tool = find_tool(&builtin_tools(), "merge_pdf").unwrap().clone();
        let state = AppState::new(SessionConfig::new(tool));
        let files = vec![
            FileCandidate::new("a.pdf", 10, PathBuf::from("a.pdf")),
            FileCandidate::new("a.pdf", 10, PathBuf::from("a.pdf")),
        ];
        update(state, Msg::FilesChosen(files)).0
    }

    #[test]
    fn notices_are_reported_once() {
        let state = merged_session();
        let mut reporter = Reporter::new();
        let first = reporter.describe(&state.view());
        assert_eq!(
            first,
            vec![
                "warning: a.pdf is already added".to_string(),
                "merge_pdf: 1 staged, Add 1 more file".to_string(),
            ]
        );
        assert!(reporter.describe(&state.view()).is_empty());
    }

    #[test]
    fn success_outcome_lists_metrics_and_location() {
        let state = merged_session();
        let (state, _) = update(
            state,
            Msg::FilesChosen(vec![FileCandidate::new("b.pdf", 10, PathBuf::from("b.pdf"))]),
        );
        let (state, _) = update(
            state,
            Msg::SubmitClicked {
                extra_fields: Vec::new(),
            },
        );
        let (state, _) = update(
            state,
            Msg::SubmissionSucceeded {
                submission: 1,
                handle: JobHandle::Ready(JobResult {
                    download_url: "/media/m.pdf".to_string(),
                    metrics: JobMetrics {
                        size_after: Some(20),
                        ..JobMetrics::default()
                    },
                }),
            },
        );
        let view = state.view();
        assert_eq!(
            outcome_lines(&view, None),
            vec!["Done.", "  Size: 20 B", "  Download: /media/m.pdf"]
        );
        assert_eq!(
            outcome_lines(&view, Some(Path::new("out/m.pdf"))).last().unwrap(),
            "  Saved to out/m.pdf"
        );
    }
}
