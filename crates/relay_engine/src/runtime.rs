use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use relay_core::{
    DocumentToken, JobTicket, NoticeId, PollGeneration, SubmissionId, SubmissionPayload,
};
use relay_logging::{relay_debug, relay_info};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::{ChannelProgressSink, ClientSettings, ConversionApi, ProgressSink, ReqwestApi};
use crate::document::count_pages;
use crate::download::ArtifactDownloader;
use crate::EngineEvent;

const MIN_TIMER_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

enum EngineCommand {
    Timer(TimerCommand),
    Task(TaskCommand),
    Shutdown,
}

enum TimerCommand {
    Start {
        generation: PollGeneration,
        interval: Duration,
    },
    Cancel {
        generation: PollGeneration,
    },
}

enum TaskCommand {
    Submit {
        submission: SubmissionId,
        payload: SubmissionPayload,
    },
    QueryStatus {
        generation: PollGeneration,
        ticket: JobTicket,
    },
    InspectDocument {
        token: DocumentToken,
        path: PathBuf,
    },
    DismissNotice {
        id: NoticeId,
        after: Duration,
    },
    Download {
        url: String,
    },
}

struct Services {
    api: Arc<dyn ConversionApi>,
    downloader: ArtifactDownloader,
}

/// Owns the IO thread. Commands go in, [`EngineEvent`]s come out.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings, output_dir: PathBuf) -> Result<Self, EngineError> {
        let api = ReqwestApi::new(settings)?;
        let downloader = ArtifactDownloader::new(&api, output_dir);
        let services = Arc::new(Services {
            api: Arc::new(api),
            downloader,
        });
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            // At most one poll timer exists at any time.
            let mut timer: Option<(PollGeneration, JoinHandle<()>)> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Timer(TimerCommand::Start {
                        generation,
                        interval,
                    }) => {
                        if let Some((previous, task)) = timer.take() {
                            relay_debug!("Replacing poll timer {}", previous);
                            task.abort();
                        }
                        let task = runtime.spawn(run_timer(generation, interval, event_tx.clone()));
                        timer = Some((generation, task));
                    }
                    EngineCommand::Timer(TimerCommand::Cancel { generation }) => {
                        if timer.as_ref().is_some_and(|(active, _)| *active == generation) {
                            if let Some((_, task)) = timer.take() {
                                task.abort();
                                relay_debug!("Cancelled poll timer {}", generation);
                            }
                        }
                    }
                    EngineCommand::Task(task) => {
                        runtime.spawn(handle_task(services.clone(), task, event_tx.clone()));
                    }
                    EngineCommand::Shutdown => break,
                }
            }
            if let Some((_, task)) = timer.take() {
                task.abort();
            }
            runtime.shutdown_background();
            relay_info!("Engine stopped");
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    pub fn submit(&self, submission: SubmissionId, payload: SubmissionPayload) {
        self.send_task(TaskCommand::Submit {
            submission,
            payload,
        });
    }

    /// Starts the poll timer, replacing any running one. The first tick
    /// fires one `interval` from now.
    pub fn start_poll_timer(&self, generation: PollGeneration, interval: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::Timer(TimerCommand::Start {
            generation,
            interval,
        }));
    }

    pub fn cancel_poll_timer(&self, generation: PollGeneration) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::Timer(TimerCommand::Cancel { generation }));
    }

    pub fn query_status(&self, generation: PollGeneration, ticket: JobTicket) {
        self.send_task(TaskCommand::QueryStatus { generation, ticket });
    }

    pub fn inspect_document(&self, token: DocumentToken, path: PathBuf) {
        self.send_task(TaskCommand::InspectDocument { token, path });
    }

    pub fn dismiss_notice_after(&self, id: NoticeId, after: Duration) {
        self.send_task(TaskCommand::DismissNotice { id, after });
    }

    pub fn download(&self, url: impl Into<String>) {
        self.send_task(TaskCommand::Download { url: url.into() });
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send_task(&self, task: TaskCommand) {
        let _ = self.cmd_tx.send(EngineCommand::Task(task));
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

async fn run_timer(generation: PollGeneration, interval: Duration, event_tx: mpsc::Sender<EngineEvent>) {
    let period = interval.max(MIN_TIMER_PERIOD);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if event_tx.send(EngineEvent::PollTick { generation }).is_err() {
            break;
        }
    }
}

async fn handle_task(services: Arc<Services>, task: TaskCommand, event_tx: mpsc::Sender<EngineEvent>) {
    let event = match task {
        TaskCommand::Submit {
            submission,
            payload,
        } => {
            let sink: Arc<dyn ProgressSink> = Arc::new(ChannelProgressSink::new(event_tx.clone()));
            let result = services.api.submit(submission, &payload, sink).await;
            EngineEvent::Submitted { submission, result }
        }
        TaskCommand::QueryStatus { generation, ticket } => {
            let result = services.api.query_status(&ticket).await;
            EngineEvent::StatusQueried { generation, result }
        }
        TaskCommand::InspectDocument { token, path } => {
            let result = tokio::task::spawn_blocking(move || count_pages(&path))
                .await
                .map_err(|err| format!("inspection was interrupted: {err}"))
                .and_then(|counted| counted.map_err(|err| err.to_string()));
            EngineEvent::DocumentInspected { token, result }
        }
        TaskCommand::DismissNotice { id, after } => {
            tokio::time::sleep(after).await;
            EngineEvent::NoticeExpired(id)
        }
        TaskCommand::Download { url } => {
            let result = services
                .downloader
                .download(&url)
                .await
                .map_err(|err| err.to_string());
            EngineEvent::Downloaded { url, result }
        }
    };
    let _ = event_tx.send(event);
}
