use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_core::{
    builtin_tools, find_tool, update, AppState, Effect, FileCandidate, JobHandle, JobMetrics,
    JobResult, JobTicket, Msg, PollConfig, PollPhase, ResultView, SessionConfig, StatusReport,
    TIMED_OUT_MESSAGE,
};

const MAX_ATTEMPTS: u32 = 4;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

fn ticket() -> JobTicket {
    JobTicket {
        job_id: "99".to_string(),
        status_url: "/api/v1/conversions/99/".to_string(),
    }
}

/// Stages a single file, submits it and accepts the queued job.
fn polling_session() -> (AppState, Vec<Effect>) {
    let tool = find_tool(&builtin_tools(), "pdf_to_docx").unwrap().clone();
    let mut config = SessionConfig::new(tool);
    config.poll = PollConfig {
        interval: Duration::from_millis(500),
        max_attempts: MAX_ATTEMPTS,
    };
    let state = AppState::new(config);
    let candidate = FileCandidate::new("scan.pdf", 2048, PathBuf::from("/uploads/scan.pdf"));
    let (state, _) = update(state, Msg::FilesChosen(vec![candidate]));
    let (state, _) = update(
        state,
        Msg::SubmitClicked {
            extra_fields: Vec::new(),
        },
    );
    update(
        state,
        Msg::SubmissionSucceeded {
            submission: 1,
            handle: JobHandle::Queued(ticket()),
        },
    )
}

fn count_queries(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::QueryStatus { .. }))
        .count()
}

fn count_timer_starts(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::StartPollTimer { .. }))
        .count()
}

fn completed() -> StatusReport {
    StatusReport::Completed(JobResult {
        download_url: "https://files.example.com/scan.docx".to_string(),
        metrics: JobMetrics {
            processing_time_secs: Some(3.2),
            size_before: Some(2048),
            size_after: Some(1024),
            compression_ratio: Some(50.0),
        },
    })
}

#[test]
fn completion_on_third_query_stops_timer() {
    init_logging();
    let (state, mut all_effects) = polling_session();
    assert_eq!(count_queries(&all_effects), 1);

    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            generation: 1,
            report: StatusReport::Pending,
        },
    );
    all_effects.extend(effects);
    assert_eq!(state.view().job_progress, 10);

    let (state, effects) = update(state, Msg::PollTick { generation: 1 });
    all_effects.extend(effects);
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            generation: 1,
            report: StatusReport::Processing,
        },
    );
    all_effects.extend(effects);
    assert_eq!(state.view().job_progress, 50);

    let (state, effects) = update(state, Msg::PollTick { generation: 1 });
    all_effects.extend(effects);
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            generation: 1,
            report: completed(),
        },
    );
    assert_eq!(effects, vec![Effect::CancelPollTimer { generation: 1 }]);
    all_effects.extend(effects);

    assert_eq!(count_queries(&all_effects), 3);
    assert_eq!(count_timer_starts(&all_effects), 1);
    assert_eq!(state.poller().queries_issued(), 3);
    assert!(!state.poller().is_timer_active());

    let view = state.view();
    assert_eq!(view.phase, PollPhase::Completed);
    assert_eq!(view.job_progress, 100);
    assert_eq!(view.snapshot.action_label, "Start over to run again");
    match view.result {
        Some(ResultView::Success {
            download_url,
            summary,
            ..
        }) => {
            assert_eq!(download_url, "https://files.example.com/scan.docx");
            assert_eq!(
                summary,
                vec!["Size: 2 KB -> 1 KB", "Reduced by 50.00%", "Processed in 3.2s"]
            );
        }
        other => panic!("unexpected result {other:?}"),
    }

    // A late tick that raced the cancellation changes nothing.
    let (state, effects) = update(state, Msg::PollTick { generation: 1 });
    assert!(effects.is_empty());
    assert_eq!(state.view().phase, PollPhase::Completed);
}

#[test]
fn endless_processing_times_out_instead_of_failing() {
    init_logging();
    let (mut state, effects) = polling_session();
    let mut queries = count_queries(&effects);
    let mut last_effects = Vec::new();

    for _ in 0..MAX_ATTEMPTS {
        let (next, _) = update(
            state,
            Msg::StatusReceived {
                generation: 1,
                report: StatusReport::Processing,
            },
        );
        let (next, effects) = update(next, Msg::PollTick { generation: 1 });
        queries += count_queries(&effects);
        last_effects = effects;
        state = next;
    }

    assert_eq!(queries, MAX_ATTEMPTS as usize);
    assert_eq!(last_effects, vec![Effect::CancelPollTimer { generation: 1 }]);
    let view = state.view();
    assert_eq!(view.phase, PollPhase::TimedOut);
    assert_eq!(
        view.result,
        Some(ResultView::TimedOut {
            message: TIMED_OUT_MESSAGE.to_string()
        })
    );
    assert!(!state.poller().is_timer_active());
}

#[test]
fn transient_query_errors_keep_polling() {
    init_logging();
    let (state, _) = polling_session();
    let (state, effects) = update(
        state,
        Msg::StatusQueryFailed {
            generation: 1,
            message: "connection reset".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().phase, PollPhase::Polling);
    assert!(state.view().notices.is_empty());

    let (state, effects) = update(state, Msg::PollTick { generation: 1 });
    assert_eq!(count_queries(&effects), 1);
    assert_eq!(state.view().phase, PollPhase::Polling);
}

#[test]
fn unknown_job_answers_run_into_the_attempt_limit() {
    init_logging();
    let (mut state, _) = polling_session();
    for _ in 0..MAX_ATTEMPTS {
        let (next, effects) = update(
            state,
            Msg::StatusQueryFailed {
                generation: 1,
                message: "http status 404: Conversion not found".to_string(),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(next.view().phase, PollPhase::Polling);
        let (next, _) = update(next, Msg::PollTick { generation: 1 });
        state = next;
    }

    let view = state.view();
    assert_eq!(view.phase, PollPhase::TimedOut);
    assert!(view.notices.is_empty());
    assert!(!state.poller().is_timer_active());
}

#[test]
fn server_failure_is_terminal_with_its_message() {
    init_logging();
    let (state, _) = polling_session();
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            generation: 1,
            report: StatusReport::Failed {
                message: Some("LibreOffice crashed".to_string()),
            },
        },
    );
    assert_eq!(effects, vec![Effect::CancelPollTimer { generation: 1 }]);
    let view = state.view();
    assert_eq!(view.phase, PollPhase::Failed);
    assert_eq!(
        view.result,
        Some(ResultView::Failure {
            message: "LibreOffice crashed".to_string()
        })
    );

    // Terminal: later answers are ignored.
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            generation: 1,
            report: completed(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().phase, PollPhase::Failed);
}

#[test]
fn start_over_cancels_timer_and_ignores_late_answers() {
    init_logging();
    let (state, _) = polling_session();
    let (state, effects) = update(state, Msg::StartOver);
    assert_eq!(effects, vec![Effect::CancelPollTimer { generation: 1 }]);
    assert!(!state.poller().is_timer_active());

    let (state, effects) = update(state, Msg::PollTick { generation: 1 });
    assert!(effects.is_empty());
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            generation: 1,
            report: completed(),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase, PollPhase::Idle);
    assert!(view.result.is_none());
    assert!(view.files.is_empty());
}
