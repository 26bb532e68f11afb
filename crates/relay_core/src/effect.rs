use std::path::PathBuf;
use std::time::Duration;

use crate::poller::{PollEffect, PollGeneration};
use crate::state::{DocumentToken, NoticeId};
use crate::submission::{JobTicket, SubmissionId, SubmissionPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InspectDocument {
        token: DocumentToken,
        path: PathBuf,
    },
    Submit {
        submission: SubmissionId,
        payload: SubmissionPayload,
    },
    StartPollTimer {
        generation: PollGeneration,
        interval: Duration,
    },
    CancelPollTimer {
        generation: PollGeneration,
    },
    QueryStatus {
        generation: PollGeneration,
        ticket: JobTicket,
    },
    ScheduleNoticeDismiss {
        id: NoticeId,
        after: Duration,
    },
}

impl From<PollEffect> for Effect {
    fn from(effect: PollEffect) -> Self {
        match effect {
            PollEffect::StartTimer {
                generation,
                interval,
            } => Effect::StartPollTimer {
                generation,
                interval,
            },
            PollEffect::CancelTimer { generation } => Effect::CancelPollTimer { generation },
            PollEffect::Query { generation, ticket } => Effect::QueryStatus { generation, ticket },
        }
    }
}
