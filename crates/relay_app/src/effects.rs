use std::path::PathBuf;
use std::time::Duration;

use relay_core::{Effect, Msg};
use relay_engine::{EngineEvent, EngineHandle};
use relay_logging::{relay_debug, relay_info, relay_warn};

/// What the driver loop receives from the engine.
#[derive(Debug)]
pub enum Inbound {
    Msg(Msg),
    Downloaded {
        url: String,
        result: Result<PathBuf, String>,
    },
}

/// Executes core effects on the engine and turns engine events back into
/// messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::InspectDocument { token, path } => {
                    relay_debug!("InspectDocument token={} path={:?}", token, path);
                    self.engine.inspect_document(token, path);
                }
                Effect::Submit {
                    submission,
                    payload,
                } => {
                    relay_info!(
                        "Submit submission={} endpoint={} bytes={}",
                        submission,
                        payload.endpoint,
                        payload.total_bytes()
                    );
                    self.engine.submit(submission, payload);
                }
                Effect::StartPollTimer {
                    generation,
                    interval,
                } => self.engine.start_poll_timer(generation, interval),
                Effect::CancelPollTimer { generation } => self.engine.cancel_poll_timer(generation),
                Effect::QueryStatus { generation, ticket } => {
                    self.engine.query_status(generation, ticket)
                }
                Effect::ScheduleNoticeDismiss { id, after } => {
                    self.engine.dismiss_notice_after(id, after)
                }
            }
        }
    }

    pub fn download(&self, url: &str) {
        self.engine.download(url);
    }

    pub fn next(&self, timeout: Duration) -> Option<Inbound> {
        self.engine.recv_timeout(timeout).map(translate)
    }
}

fn translate(event: EngineEvent) -> Inbound {
    let msg = match event {
        EngineEvent::UploadProgress {
            submission,
            percent,
        } => Msg::UploadProgress {
            submission,
            percent,
        },
        EngineEvent::Submitted { submission, result } => match result {
            Ok(handle) => Msg::SubmissionSucceeded { submission, handle },
            Err(err) => {
                relay_warn!("Submission {} failed ({}): {}", submission, err.kind, err.message);
                Msg::SubmissionFailed {
                    submission,
                    message: err.message,
                }
            }
        },
        EngineEvent::PollTick { generation } => Msg::PollTick { generation },
        EngineEvent::StatusQueried { generation, result } => match result {
            Ok(report) => Msg::StatusReceived { generation, report },
            Err(err) => Msg::StatusQueryFailed {
                generation,
                message: err.to_string(),
            },
        },
        EngineEvent::DocumentInspected { token, result } => Msg::DocumentInspected { token, result },
        EngineEvent::NoticeExpired(id) => Msg::NoticeExpired(id),
        EngineEvent::Downloaded { url, result } => return Inbound::Downloaded { url, result },
    };
    Inbound::Msg(msg)
}
