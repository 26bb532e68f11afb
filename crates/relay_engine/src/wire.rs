//! JSON bodies exchanged with the conversion server.
//!
//! Every body may arrive bare or wrapped in a
//! `{"success", "data", "message", "errors"}` envelope; [`unwrap_envelope`]
//! hides the difference.
use relay_core::{JobHandle, JobMetrics, JobResult, JobTicket, StatusReport};
use serde::Deserialize;
use serde_json::Value;

use crate::types::FailureKind;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WireError {
    Malformed(String),
    /// Envelope said `success: false`.
    Rejected(Option<String>),
    MissingField(&'static str),
    UnknownStatus(String),
}

impl WireError {
    pub(crate) fn kind(&self) -> FailureKind {
        match self {
            WireError::UnknownStatus(status) => FailureKind::UnknownStatus(status.clone()),
            _ => FailureKind::Protocol,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            WireError::Malformed(detail) => format!("malformed response body: {detail}"),
            WireError::Rejected(Some(message)) => message.clone(),
            WireError::Rejected(None) => "the server rejected the request".to_string(),
            WireError::MissingField(field) => format!("response is missing `{field}`"),
            WireError::UnknownStatus(status) => format!("unknown job status {status:?}"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobId {
    Number(u64),
    Text(String),
}

impl JobId {
    fn into_string(self) -> String {
        match self {
            JobId::Number(id) => id.to_string(),
            JobId::Text(id) => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    conversion_id: Option<JobId>,
    #[serde(default)]
    job_id: Option<JobId>,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    output_size: Option<u64>,
    #[serde(default)]
    total_size: Option<u64>,
    #[serde(default)]
    file_size_before: Option<u64>,
    #[serde(default)]
    file_size_after: Option<u64>,
    #[serde(default)]
    processing_time: Option<f64>,
    #[serde(default)]
    compression_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    processing_time: Option<f64>,
    #[serde(default)]
    file_size_before: Option<u64>,
    #[serde(default)]
    file_size_after: Option<u64>,
    #[serde(default)]
    compression_ratio: Option<f64>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Parses a successful submission body.
///
/// `status_path` builds the status locator when the server returned a job id
/// without one.
pub(crate) fn parse_submit_body(
    bytes: &[u8],
    status_path: impl Fn(&str) -> String,
) -> Result<JobHandle, WireError> {
    let body: SubmitBody = decode(bytes)?;
    if let Some(download_url) = non_empty(body.download_url) {
        return Ok(JobHandle::Ready(JobResult {
            download_url,
            metrics: JobMetrics {
                processing_time_secs: body.processing_time,
                size_before: body.file_size_before.or(body.total_size),
                size_after: body.file_size_after.or(body.output_size),
                compression_ratio: body.compression_ratio,
            },
        }));
    }

    let job_id = body
        .conversion_id
        .or(body.job_id)
        .map(JobId::into_string)
        .ok_or(WireError::MissingField("conversion_id"))?;
    let status_url = non_empty(body.status_url).unwrap_or_else(|| status_path(&job_id));
    Ok(JobHandle::Queued(JobTicket { job_id, status_url }))
}

/// Parses a status body into a report the poller understands.
pub(crate) fn parse_status_body(bytes: &[u8]) -> Result<StatusReport, WireError> {
    let body: StatusBody = decode(bytes)?;
    match body.status.trim().to_ascii_lowercase().as_str() {
        "pending" | "queued" => Ok(StatusReport::Pending),
        "processing" | "running" => Ok(StatusReport::Processing),
        "completed" => {
            let download_url =
                non_empty(body.download_url).ok_or(WireError::MissingField("download_url"))?;
            Ok(StatusReport::Completed(JobResult {
                download_url,
                metrics: JobMetrics {
                    processing_time_secs: body.processing_time,
                    size_before: body.file_size_before,
                    size_after: body.file_size_after,
                    compression_ratio: body.compression_ratio,
                },
            }))
        }
        "failed" => Ok(StatusReport::Failed {
            message: non_empty(body.error_message),
        }),
        _ => Err(WireError::UnknownStatus(body.status)),
    }
}

/// Structured error text from a body: `message`, else `error`, else `detail`.
pub(crate) fn error_message_from_body(bytes: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    ["message", "error", "detail"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| WireError::Malformed(err.to_string()))?;
    let inner = unwrap_envelope(value)?;
    serde_json::from_value(inner).map_err(|err| WireError::Malformed(err.to_string()))
}

fn unwrap_envelope(value: Value) -> Result<Value, WireError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(WireError::Rejected(
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        ));
    }
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
