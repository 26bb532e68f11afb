//! Bounded status polling for a queued conversion job.
//!
//! The poller is a plain state machine: every transition returns the
//! [`PollEffect`]s an adapter must carry out (start or cancel the interval
//! timer, issue a status query). Asynchronous answers come back tagged with the
//! [`PollGeneration`] they were issued under, and answers from an older
//! generation are dropped.
use std::time::Duration;

use relay_logging::{relay_debug, relay_info, relay_warn};

use crate::config::PollConfig;
use crate::submission::{JobResult, JobTicket};

pub type PollGeneration = u64;

pub const TIMED_OUT_MESSAGE: &str =
    "Processing is taking longer than expected. Please refresh the page to check on your file.";
pub const FAILED_FALLBACK_MESSAGE: &str = "Conversion failed. Please try again.";

/// Progress hint shown while the server reports `pending`.
pub const PENDING_PROGRESS: u8 = 10;
/// Progress hint shown while the server reports `processing`.
pub const PROCESSING_PROGRESS: u8 = 50;

/// A decoded answer from the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    Pending,
    Processing,
    Completed(JobResult),
    Failed { message: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Idle,
    Polling {
        ticket: JobTicket,
        attempts: u32,
        progress: u8,
    },
    Completed(JobResult),
    Failed {
        message: String,
    },
    TimedOut,
}

/// Coarse phase of the poller, for views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, PollPhase::Completed | PollPhase::Failed | PollPhase::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEffect {
    StartTimer {
        generation: PollGeneration,
        interval: Duration,
    },
    CancelTimer {
        generation: PollGeneration,
    },
    Query {
        generation: PollGeneration,
        ticket: JobTicket,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobPoller {
    config: PollConfig,
    state: PollState,
    generation: PollGeneration,
    timer_active: bool,
    queries_issued: u32,
}

impl JobPoller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            state: PollState::Idle,
            generation: 0,
            timer_active: false,
            queries_issued: 0,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn phase(&self) -> PollPhase {
        match self.state {
            PollState::Idle => PollPhase::Idle,
            PollState::Polling { .. } => PollPhase::Polling,
            PollState::Completed(_) => PollPhase::Completed,
            PollState::Failed { .. } => PollPhase::Failed,
            PollState::TimedOut => PollPhase::TimedOut,
        }
    }

    pub fn generation(&self) -> PollGeneration {
        self.generation
    }

    pub fn is_timer_active(&self) -> bool {
        self.timer_active
    }

    /// Status queries issued since the last reset.
    pub fn queries_issued(&self) -> u32 {
        self.queries_issued
    }

    pub fn progress(&self) -> u8 {
        match &self.state {
            PollState::Idle | PollState::Failed { .. } | PollState::TimedOut => 0,
            PollState::Polling { progress, .. } => *progress,
            PollState::Completed(_) => 100,
        }
    }

    /// Enters `Polling`: starts the timer and queries once right away.
    /// Does nothing unless the poller is idle.
    pub fn start(&mut self, ticket: JobTicket) -> Vec<PollEffect> {
        if self.state != PollState::Idle {
            relay_debug!("Ignoring poll start for job {}: poller busy", ticket.job_id);
            return Vec::new();
        }
        self.generation += 1;
        relay_info!(
            "Polling job {} every {:?} (max {} attempts)",
            ticket.job_id,
            self.config.interval,
            self.config.max_attempts
        );
        self.state = PollState::Polling {
            ticket: ticket.clone(),
            attempts: 1,
            progress: 0,
        };
        self.timer_active = true;
        self.queries_issued += 1;
        vec![
            PollEffect::StartTimer {
                generation: self.generation,
                interval: self.config.interval,
            },
            PollEffect::Query {
                generation: self.generation,
                ticket,
            },
        ]
    }

    /// Latches a result the submission call already delivered.
    pub fn latch_ready(&mut self, result: JobResult) {
        if self.state == PollState::Idle {
            self.state = PollState::Completed(result);
        }
    }

    pub fn on_tick(&mut self, generation: PollGeneration) -> Vec<PollEffect> {
        if !self.is_current(generation) {
            relay_debug!("Discarding stale poll tick (generation {})", generation);
            return Vec::new();
        }
        let max_attempts = self.config.max_attempts;
        let PollState::Polling {
            ticket, attempts, ..
        } = &mut self.state
        else {
            return Vec::new();
        };

        *attempts += 1;
        if *attempts > max_attempts {
            relay_warn!(
                "Job {} still not finished after {} status queries; giving up",
                ticket.job_id,
                max_attempts
            );
            self.state = PollState::TimedOut;
            return self.stop_timer();
        }

        let ticket = ticket.clone();
        self.queries_issued += 1;
        vec![PollEffect::Query {
            generation: self.generation,
            ticket,
        }]
    }

    pub fn on_report(&mut self, generation: PollGeneration, report: StatusReport) -> Vec<PollEffect> {
        if !self.is_current(generation) {
            relay_debug!("Discarding stale status report (generation {})", generation);
            return Vec::new();
        }
        let PollState::Polling { ticket, progress, .. } = &mut self.state else {
            return Vec::new();
        };

        match report {
            StatusReport::Pending => {
                *progress = (*progress).max(PENDING_PROGRESS);
                Vec::new()
            }
            StatusReport::Processing => {
                *progress = (*progress).max(PROCESSING_PROGRESS);
                Vec::new()
            }
            StatusReport::Completed(result) => {
                relay_info!("Job {} completed: {}", ticket.job_id, result.download_url);
                self.state = PollState::Completed(result);
                self.stop_timer()
            }
            StatusReport::Failed { message } => {
                let message = message
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| FAILED_FALLBACK_MESSAGE.to_string());
                relay_warn!("Job {} failed: {}", ticket.job_id, message);
                self.state = PollState::Failed { message };
                self.stop_timer()
            }
        }
    }

    /// A query that could not complete. Polling carries on with the next tick.
    pub fn on_query_error(&mut self, generation: PollGeneration, message: &str) -> Vec<PollEffect> {
        if self.is_current(generation) && self.phase() == PollPhase::Polling {
            relay_warn!("Status query failed, will retry on next tick: {}", message);
        }
        Vec::new()
    }

    /// Returns to `Idle`, cancelling the timer and invalidating in-flight answers.
    pub fn reset(&mut self) -> Vec<PollEffect> {
        let effects = self.stop_timer();
        self.generation += 1;
        self.state = PollState::Idle;
        self.queries_issued = 0;
        effects
    }

    fn is_current(&self, generation: PollGeneration) -> bool {
        generation == self.generation
    }

    fn stop_timer(&mut self) -> Vec<PollEffect> {
        if !self.timer_active {
            return Vec::new();
        }
        self.timer_active = false;
        vec![PollEffect::CancelTimer {
            generation: self.generation,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> JobTicket {
        JobTicket {
            job_id: "42".to_string(),
            status_url: "/api/v1/conversions/42/".to_string(),
        }
    }

    fn poller(max_attempts: u32) -> JobPoller {
        JobPoller::new(PollConfig {
            interval: Duration::from_millis(100),
            max_attempts,
        })
    }

    #[test]
    fn start_queries_immediately_and_starts_one_timer() {
        let mut poller = poller(5);
        let effects = poller.start(ticket());
        assert_eq!(
            effects,
            vec![
                PollEffect::StartTimer {
                    generation: 1,
                    interval: Duration::from_millis(100)
                },
                PollEffect::Query {
                    generation: 1,
                    ticket: ticket()
                },
            ]
        );
        assert!(poller.start(ticket()).is_empty());
        assert_eq!(poller.queries_issued(), 1);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut poller = poller(5);
        poller.start(ticket());
        poller.reset();
        assert!(poller.on_tick(1).is_empty());
        assert!(poller
            .on_report(1, StatusReport::Completed(JobResult {
                download_url: "/d".to_string(),
                metrics: Default::default(),
            }))
            .is_empty());
        assert_eq!(poller.phase(), PollPhase::Idle);
    }

    #[test]
    fn progress_hints_never_go_backwards() {
        let mut poller = poller(5);
        poller.start(ticket());
        poller.on_report(1, StatusReport::Processing);
        poller.on_report(1, StatusReport::Pending);
        assert_eq!(poller.progress(), PROCESSING_PROGRESS);
    }

    #[test]
    fn failure_without_message_uses_fallback() {
        let mut poller = poller(5);
        poller.start(ticket());
        let effects = poller.on_report(1, StatusReport::Failed { message: Some("  ".into()) });
        assert_eq!(effects, vec![PollEffect::CancelTimer { generation: 1 }]);
        assert_eq!(
            poller.state(),
            &PollState::Failed {
                message: FAILED_FALLBACK_MESSAGE.to_string()
            }
        );
    }
}
