use relay_logging::{relay_debug, relay_info, relay_warn};

use crate::config::ToolMode;
use crate::poller::{PollEffect, PollPhase};
use crate::selection::SelectionError;
use crate::staging::StagingLock;
use crate::state::{DocumentToken, NoticeLevel};
use crate::submission::{build_payload, JobHandle, SubmissionId};
use crate::validate::FileCandidate;
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesChosen(candidates) => stage_files(&mut state, candidates),
        Msg::DocumentInspected { token, result } => document_inspected(&mut state, token, result),
        Msg::RemoveFile { position } => edit_selection(&mut state, |staging| {
            staging.remove_file(position).map(|_| ())
        }),
        Msg::ReorderFile { from, to } => {
            edit_selection(&mut state, |staging| staging.reorder_files(from, to))
        }
        Msg::TogglePage(page) => {
            edit_selection(&mut state, |staging| staging.toggle_page(page).map(|_| ()))
        }
        Msg::SelectAllPages => edit_selection(&mut state, |staging| staging.select_all_pages()),
        Msg::ClearPageSelection => {
            edit_selection(&mut state, |staging| staging.clear_page_selection())
        }
        Msg::SubmitClicked { extra_fields } => submit(&mut state, &extra_fields),
        Msg::UploadProgress {
            submission,
            percent,
        } => {
            if state.in_flight() == Some(submission) && state.record_upload_progress(percent) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SubmissionSucceeded { submission, handle } => {
            submission_succeeded(&mut state, submission, handle)
        }
        Msg::SubmissionFailed {
            submission,
            message,
        } => submission_failed(&mut state, submission, message),
        Msg::PollTick { generation } => {
            drive_poller(&mut state, |poller| poller.on_tick(generation))
        }
        Msg::StatusReceived { generation, report } => {
            drive_poller(&mut state, |poller| poller.on_report(generation, report))
        }
        Msg::StatusQueryFailed {
            generation,
            message,
        } => drive_poller(&mut state, |poller| {
            poller.on_query_error(generation, &message)
        }),
        Msg::NoticeExpired(id) => {
            if state.dismiss_notice(id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::StartOver => start_over(&mut state),
    };

    (state, effects)
}

fn stage_files(state: &mut AppState, candidates: Vec<FileCandidate>) -> Vec<Effect> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let mut effects = Vec::new();
    if state.in_flight().is_some() || state.poller().phase() == PollPhase::Polling {
        effects.push(state.push_notice(
            NoticeLevel::Warning,
            "A job is already running. Wait for it to finish or start over.",
        ));
        return effects;
    }
    // A finished job stays on screen until the user stages something new.
    if state.poller().phase().is_terminal() {
        effects.extend(start_over(state));
    }

    let report = state.staging_mut().stage_files(candidates);
    for rejection in &report.rejected {
        effects.push(state.push_notice(NoticeLevel::Error, rejection.to_string()));
    }
    for name in &report.duplicates {
        relay_info!("Skipping duplicate file {}", name);
        effects.push(state.push_notice(NoticeLevel::Warning, format!("{name} is already added")));
    }
    if !report.ignored.is_empty() {
        let text = format!(
            "Only one file can be used at a time; ignored {}",
            report.ignored.join(", ")
        );
        effects.push(state.push_notice(NoticeLevel::Info, text));
    }

    if !report.accepted.is_empty() {
        state.mark_dirty();
        if state.staging().mode() == ToolMode::PageExtract {
            if let Some(path) = state.staging().files().get(0).map(|file| file.path.clone()) {
                let token = state.next_document();
                effects.push(Effect::InspectDocument { token, path });
            }
        }
    }
    effects
}

fn document_inspected(
    state: &mut AppState,
    token: DocumentToken,
    result: Result<u32, String>,
) -> Vec<Effect> {
    if state.pending_document() != Some(token) {
        relay_debug!("Discarding stale document inspection (token {})", token);
        return Vec::new();
    }
    state.clear_pending_document();
    state.mark_dirty();

    let failure = match result {
        Ok(0) => "the document has no pages".to_string(),
        Ok(page_count) => match state.staging_mut().load_pages(page_count) {
            Ok(()) => return Vec::new(),
            Err(err) => err.to_string(),
        },
        Err(message) => message,
    };
    relay_warn!("Document inspection failed: {}", failure);
    state.staging_mut().reset();
    vec![state.push_notice(
        NoticeLevel::Error,
        format!("Could not read the document: {failure}"),
    )]
}

fn edit_selection<F>(state: &mut AppState, edit: F) -> Vec<Effect>
where
    F: FnOnce(&mut crate::StagingController) -> Result<(), SelectionError>,
{
    if state.job_active() {
        relay_debug!("Ignoring selection change while a job is active");
        return Vec::new();
    }
    match edit(state.staging_mut()) {
        Ok(()) => {
            if state.staging().files().is_empty() {
                state.clear_pending_document();
            }
            state.mark_dirty();
            Vec::new()
        }
        Err(err) => vec![state.push_notice(NoticeLevel::Warning, err.to_string())],
    }
}

fn submit(state: &mut AppState, extra_fields: &[(String, String)]) -> Vec<Effect> {
    if let Some(outstanding) = state.in_flight() {
        relay_warn!(
            "Submission {} is still in flight; ignoring submit",
            outstanding
        );
        return Vec::new();
    }
    if !state.staging().can_submit() || state.poller().phase() != PollPhase::Idle {
        relay_debug!("Submit ignored: selection not ready");
        return Vec::new();
    }

    let payload = build_payload(state.staging(), extra_fields);
    let submission = state.begin_submission();
    state.staging_mut().set_lock(StagingLock::Uploading);
    state.mark_dirty();
    relay_info!(
        "Submitting {} part(s) to {} (submission {})",
        payload.parts.len(),
        payload.endpoint,
        submission
    );
    vec![Effect::Submit {
        submission,
        payload,
    }]
}

fn submission_succeeded(
    state: &mut AppState,
    submission: SubmissionId,
    handle: JobHandle,
) -> Vec<Effect> {
    if state.in_flight() != Some(submission) {
        relay_debug!("Discarding response for stale submission {}", submission);
        return Vec::new();
    }
    state.finish_submission();
    state.mark_dirty();
    match handle {
        JobHandle::Ready(result) => {
            relay_info!("Submission {} finished synchronously", submission);
            state.poller_mut().latch_ready(result);
            state.staging_mut().set_lock(StagingLock::Finished);
            Vec::new()
        }
        JobHandle::Queued(ticket) => {
            relay_info!("Submission {} queued as job {}", submission, ticket.job_id);
            state.staging_mut().set_lock(StagingLock::Processing);
            state
                .poller_mut()
                .start(ticket)
                .into_iter()
                .map(Effect::from)
                .collect()
        }
    }
}

fn submission_failed(state: &mut AppState, submission: SubmissionId, message: String) -> Vec<Effect> {
    if state.in_flight() != Some(submission) {
        relay_debug!("Discarding failure for stale submission {}", submission);
        return Vec::new();
    }
    relay_warn!("Submission {} failed: {}", submission, message);
    state.finish_submission();
    state.staging_mut().set_lock(StagingLock::Open);
    vec![state.push_notice(NoticeLevel::Error, message)]
}

fn drive_poller<F>(state: &mut AppState, step: F) -> Vec<Effect>
where
    F: FnOnce(&mut crate::JobPoller) -> Vec<PollEffect>,
{
    let phase_before = state.poller().phase();
    let progress_before = state.poller().progress();
    let effects = step(state.poller_mut());
    let phase = state.poller().phase();
    if phase.is_terminal() && phase != phase_before {
        state.staging_mut().set_lock(StagingLock::Finished);
    }
    if phase != phase_before || state.poller().progress() != progress_before {
        state.mark_dirty();
    }
    effects.into_iter().map(Effect::from).collect()
}

fn start_over(state: &mut AppState) -> Vec<Effect> {
    let effects = state
        .poller_mut()
        .reset()
        .into_iter()
        .map(Effect::from)
        .collect();
    state.staging_mut().reset();
    state.finish_submission();
    state.clear_pending_document();
    state.clear_notices();
    state.mark_dirty();
    relay_info!("Session reset");
    effects
}
