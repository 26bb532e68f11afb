use relay_core::{builtin_tools, find_tool, update, AppState, Msg, SessionConfig, StatusReport};

fn idle_session() -> AppState {
    let tool = find_tool(&builtin_tools(), "merge_pdf").unwrap().clone();
    AppState::new(SessionConfig::new(tool))
}

#[test]
fn messages_without_a_matching_operation_change_nothing() {
    let state = idle_session();
    let stray = vec![
        Msg::PollTick { generation: 1 },
        Msg::StatusReceived {
            generation: 0,
            report: StatusReport::Processing,
        },
        Msg::UploadProgress {
            submission: 1,
            percent: 50,
        },
        Msg::NoticeExpired(42),
        Msg::SubmitClicked {
            extra_fields: Vec::new(),
        },
        Msg::FilesChosen(Vec::new()),
    ];

    let mut next = state.clone();
    for msg in stray {
        let (after, effects) = update(next, msg);
        assert!(effects.is_empty());
        next = after;
    }
    assert_eq!(state, next);
}
