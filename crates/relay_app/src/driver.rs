use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use relay_core::{
    update, AppState, AppViewModel, FileCandidate, Msg, PollPhase, ResultView, SessionConfig,
    ToolMode,
};
use relay_logging::{relay_info, relay_warn};

use crate::cli::PageChoice;
use crate::effects::{EffectRunner, Inbound};
use crate::report::Reporter;

const RECV_SLICE: Duration = Duration::from_millis(100);
/// Upper bound for steps that have no poll limit of their own.
const STEP_TIMEOUT: Duration = Duration::from_secs(600);

pub struct SessionRequest {
    pub files: Vec<PathBuf>,
    pub pages: Option<PageChoice>,
    pub extra_fields: Vec<(String, String)>,
    pub download: bool,
}

pub struct SessionOutcome {
    pub view: AppViewModel,
    pub saved: Option<PathBuf>,
}

/// Runs one staging session from file selection to a terminal result.
pub struct Driver<'a> {
    runner: &'a EffectRunner,
    reporter: Reporter,
}

impl<'a> Driver<'a> {
    pub fn new(runner: &'a EffectRunner) -> Self {
        Self {
            runner,
            reporter: Reporter::new(),
        }
    }

    pub fn run(mut self, config: SessionConfig, request: SessionRequest) -> Result<SessionOutcome> {
        let mode = config.tool.mode;
        let job_window = config
            .poll
            .interval
            .checked_mul(config.poll.max_attempts.saturating_add(1))
            .unwrap_or(Duration::MAX);
        let candidates = request
            .files
            .iter()
            .map(|path| candidate_for(path))
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.dispatch(AppState::new(config), Msg::FilesChosen(candidates));
        if mode == ToolMode::PageExtract {
            state = self.pump_until(state, STEP_TIMEOUT, |view| !view.inspecting_document)?;
            state = self.select_pages(state, request.pages.as_ref())?;
        }

        let view = state.view();
        if !view.snapshot.can_submit {
            bail!("Nothing to submit: {}", view.snapshot.action_label);
        }

        state = self.dispatch(
            state,
            Msg::SubmitClicked {
                extra_fields: request.extra_fields,
            },
        );
        state = self.pump_until(state, STEP_TIMEOUT.saturating_add(job_window), |view| {
            view.phase.is_terminal()
                || (view.upload_percent.is_none() && view.phase == PollPhase::Idle)
        })?;

        let view = state.view();
        let saved = match (&view.result, request.download) {
            (Some(ResultView::Success { download_url, .. }), true) => {
                Some(self.download(download_url)?)
            }
            _ => None,
        };
        Ok(SessionOutcome { view, saved })
    }

    fn select_pages(&mut self, state: AppState, pages: Option<&PageChoice>) -> Result<AppState> {
        let page_count = state.staging().pages().page_count();
        if page_count == 0 {
            bail!("The document could not be staged");
        }
        let state = match pages {
            None => bail!("This tool needs --pages (e.g. --pages 1-3,5 or --pages all)"),
            Some(PageChoice::All) => self.dispatch(state, Msg::SelectAllPages),
            Some(choice) => {
                let page_count = u32::try_from(page_count).unwrap_or(u32::MAX);
                let wanted = choice.pages_within(page_count);
                if wanted.is_empty() {
                    bail!("None of the requested pages exist; the document has {page_count} pages");
                }
                relay_info!("Selecting {} of {} pages", wanted.len(), page_count);
                wanted
                    .into_iter()
                    .fold(state, |state, page| self.dispatch(state, Msg::TogglePage(page)))
            }
        };
        Ok(state)
    }

    fn dispatch(&mut self, state: AppState, msg: Msg) -> AppState {
        let (mut state, effects) = update(state, msg);
        self.runner.run(effects);
        if state.consume_dirty() {
            self.reporter.print(&state.view());
        }
        state
    }

    fn pump_until<F>(&mut self, mut state: AppState, timeout: Duration, done: F) -> Result<AppState>
    where
        F: Fn(&AppViewModel) -> bool,
    {
        let deadline = Instant::now().checked_add(timeout);
        while !done(&state.view()) {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                bail!("Gave up waiting after {:?}", timeout);
            }
            match self.runner.next(RECV_SLICE) {
                Some(Inbound::Msg(msg)) => state = self.dispatch(state, msg),
                Some(Inbound::Downloaded { url, .. }) => {
                    relay_warn!("Ignoring unexpected download result for {}", url);
                }
                None => {}
            }
        }
        Ok(state)
    }

    fn download(&mut self, url: &str) -> Result<PathBuf> {
        self.runner.download(url);
        let deadline = Instant::now() + STEP_TIMEOUT;
        while Instant::now() < deadline {
            // Notice expiries still arrive here; they no longer matter.
            if let Some(Inbound::Downloaded {
                url: finished,
                result,
            }) = self.runner.next(RECV_SLICE)
            {
                if finished != url {
                    continue;
                }
                let path = result.map_err(anyhow::Error::msg)?;
                relay_info!("Artifact saved to {:?}", path);
                return Ok(path);
            }
        }
        bail!("Download of {url} did not finish");
    }
}

fn candidate_for(path: &Path) -> Result<FileCandidate> {
    let meta = fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(FileCandidate::new(name, meta.len(), path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn candidates_carry_name_and_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan.pdf");
        fs::write(&path, b"12345").unwrap();
        let candidate = candidate_for(&path).unwrap();
        assert_eq!(candidate.name, "scan.pdf");
        assert_eq!(candidate.size_bytes, 5);
    }

    #[test]
    fn directories_are_not_candidates() {
        let temp = TempDir::new().unwrap();
        assert!(candidate_for(temp.path()).is_err());
        assert!(candidate_for(&temp.path().join("missing.pdf")).is_err());
    }
}
