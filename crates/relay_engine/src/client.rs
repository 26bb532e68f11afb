use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use relay_core::{JobHandle, JobTicket, StatusReport, SubmissionId, SubmissionPayload};
use relay_logging::{relay_debug, relay_info, relay_warn};
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::wire::{error_message_from_body, parse_status_body, parse_submit_body};
use crate::{EngineEvent, FailureKind, StatusError, SubmitError};

/// Shown when a failed upload response carries no usable message.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Url,
    /// Sent as `X-CSRFToken` on every mutating call.
    pub csrf_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Used when a queued job comes back without a status locator.
    /// `{job_id}` is replaced with the job id.
    pub status_path_template: String,
    pub upload_chunk_size: usize,
}

impl ClientSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            csrf_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            status_path_template: "/api/v1/conversions/{job_id}/".to_string(),
            upload_chunk_size: 64 * 1024,
        }
    }

    pub fn status_path(&self, job_id: &str) -> String {
        self.status_path_template.replace("{job_id}", job_id)
    }

    /// Resolves a server-relative or absolute locator against the base url.
    pub fn resolve(&self, locator: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(locator)
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait ConversionApi: Send + Sync {
    /// Uploads the payload in a single request.
    async fn submit(
        &self,
        submission: SubmissionId,
        payload: &SubmissionPayload,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, SubmitError>;

    async fn query_status(&self, ticket: &JobTicket) -> Result<StatusReport, StatusError>;
}

/// Turns streamed byte counts into non-decreasing percentages.
struct UploadTracker {
    submission: SubmissionId,
    total: u64,
    sent: AtomicU64,
    last_percent: AtomicU8,
    sink: Arc<dyn ProgressSink>,
}

impl UploadTracker {
    fn new(submission: SubmissionId, total: u64, sink: Arc<dyn ProgressSink>) -> Self {
        sink.emit(EngineEvent::UploadProgress {
            submission,
            percent: 0,
        });
        Self {
            submission,
            total,
            sent: AtomicU64::new(0),
            last_percent: AtomicU8::new(0),
            sink,
        }
    }

    fn advance(&self, bytes: usize) {
        let sent = self.sent.fetch_add(bytes as u64, Ordering::Relaxed) + bytes as u64;
        // 100 is reserved for the server's answer.
        let percent = if self.total == 0 {
            99
        } else {
            (sent.saturating_mul(100) / self.total).min(99) as u8
        };
        self.report(percent);
    }

    fn finish(&self) {
        self.report(100);
    }

    fn report(&self, percent: u8) {
        let previous = self.last_percent.fetch_max(percent, Ordering::Relaxed);
        if percent > previous {
            self.sink.emit(EngineEvent::UploadProgress {
                submission: self.submission,
                percent,
            });
        }
    }
}

pub struct ReqwestApi {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ClientSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    async fn build_form(
        &self,
        submission: SubmissionId,
        payload: &SubmissionPayload,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<(Form, Arc<UploadTracker>), SubmitError> {
        let mut opened = Vec::with_capacity(payload.parts.len());
        for part in &payload.parts {
            let unreadable = |err: std::io::Error| {
                SubmitError::new(
                    FailureKind::Io,
                    format!("Could not read {}: {err}", part.file_name),
                )
            };
            let file = tokio::fs::File::open(&part.path).await.map_err(unreadable)?;
            // The staged size may be stale; the body length must be exact.
            let length = file.metadata().await.map_err(unreadable)?.len();
            opened.push((part, file, length));
        }

        let total = opened.iter().map(|(_, _, length)| *length).sum();
        let tracker = Arc::new(UploadTracker::new(submission, total, sink));

        let mut form = Form::new();
        for (part, file, length) in opened {
            let counter = tracker.clone();
            let stream = ReaderStream::with_capacity(file, self.settings.upload_chunk_size).map(
                move |chunk| {
                    if let Ok(bytes) = &chunk {
                        counter.advance(bytes.len());
                    }
                    chunk
                },
            );
            let body = reqwest::Body::wrap_stream(stream);
            let file_part =
                Part::stream_with_length(body, length).file_name(part.file_name.clone());
            form = form.part(part.field.clone(), file_part);
        }
        for (name, value) in &payload.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok((form, tracker))
    }
}

#[async_trait::async_trait]
impl ConversionApi for ReqwestApi {
    async fn submit(
        &self,
        submission: SubmissionId,
        payload: &SubmissionPayload,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, SubmitError> {
        let url = self
            .settings
            .resolve(&payload.endpoint)
            .map_err(|err| SubmitError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let (form, tracker) = self.build_form(submission, payload, sink).await?;

        relay_info!(
            "POST {} ({} part(s), {} field(s))",
            url,
            payload.parts.len(),
            payload.fields.len()
        );
        let mut request = self.client.post(url).multipart(form);
        if let Some(token) = &self.settings.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        let response = request.send().await.map_err(map_submit_error)?;
        tracker.finish();

        let status = response.status();
        let body = response.bytes().await.map_err(map_submit_error)?;
        if !status.is_success() {
            let message =
                error_message_from_body(&body).unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string());
            relay_warn!("Submission {} rejected with {}: {}", submission, status, message);
            return Err(SubmitError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        parse_submit_body(&body, |job_id| self.settings.status_path(job_id))
            .map_err(|err| SubmitError::new(err.kind(), err.describe()))
    }

    async fn query_status(&self, ticket: &JobTicket) -> Result<StatusReport, StatusError> {
        let url = self
            .settings
            .resolve(&ticket.status_url)
            .map_err(|err| StatusError::new(FailureKind::InvalidUrl, err.to_string()))?;
        relay_debug!("GET {} (job {})", url, ticket.job_id);

        let response = self.client.get(url).send().await.map_err(map_status_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_status_error)?;
        if !status.is_success() {
            let message = error_message_from_body(&body).unwrap_or_else(|| status.to_string());
            // Still a transient query failure to the poller; a job the server
            // does not know runs into the attempt limit.
            if status.is_client_error() {
                relay_warn!(
                    "Status query for job {} rejected with {}: {}",
                    ticket.job_id,
                    status,
                    message
                );
            }
            return Err(StatusError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        parse_status_body(&body).map_err(|err| StatusError::new(err.kind(), err.describe()))
    }
}

fn map_submit_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        return SubmitError::new(
            FailureKind::Timeout,
            "The upload timed out. Please try again.",
        );
    }
    SubmitError::new(
        FailureKind::Network,
        format!("Could not reach the server: {err}"),
    )
}

fn map_status_error(err: reqwest::Error) -> StatusError {
    if err.is_timeout() {
        return StatusError::new(FailureKind::Timeout, err.to_string());
    }
    StatusError::new(FailureKind::Network, err.to_string())
}
