use std::path::PathBuf;

use crate::config::ToolMode;
use crate::staging::StagingController;

pub type SubmissionId = u64;

/// One binary part of the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPart {
    pub field: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Everything needed to issue one submission call, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub endpoint: String,
    pub parts: Vec<PayloadPart>,
    pub fields: Vec<(String, String)>,
}

impl SubmissionPayload {
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|part| part.size_bytes).sum()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Serializes the current selection: binary parts first, then selection
/// metadata, then caller-supplied fields.
pub fn build_payload(
    staging: &StagingController,
    extra_fields: &[(String, String)],
) -> SubmissionPayload {
    let mode = staging.mode();
    let parts = staging
        .files()
        .items()
        .iter()
        .map(|file| PayloadPart {
            field: mode.file_field().to_string(),
            file_name: file.name.clone(),
            path: file.path.clone(),
            size_bytes: file.size_bytes,
        })
        .collect();

    let mut fields = Vec::new();
    if mode == ToolMode::PageExtract {
        let pages = staging.pages();
        let selected = pages.selected_sorted();
        let ranges: Vec<[u32; 2]> = pages
            .selected_range()
            .map(|(first, last)| vec![[first, last]])
            .unwrap_or_default();
        fields.push(("split_mode".to_string(), "custom".to_string()));
        // Plain integers and integer pairs always serialize.
        let selected = serde_json::to_string(&selected).unwrap_or_else(|_| "[]".to_string());
        let ranges = serde_json::to_string(&ranges).unwrap_or_else(|_| "[]".to_string());
        fields.push(("selected_pages".to_string(), selected));
        fields.push(("page_ranges".to_string(), ranges));
    }
    fields.extend(extra_fields.iter().cloned());

    SubmissionPayload {
        endpoint: staging.tool().endpoint.clone(),
        parts,
        fields,
    }
}

/// Size and timing figures reported for a finished job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobMetrics {
    pub processing_time_secs: Option<f64>,
    pub size_before: Option<u64>,
    pub size_after: Option<u64>,
    pub compression_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub download_url: String,
    pub metrics: JobMetrics,
}

/// Where to ask about a queued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    pub job_id: String,
    pub status_url: String,
}

/// What a successful submission call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobHandle {
    /// Synchronous tools answer with the artifact straight away.
    Ready(JobResult),
    Queued(JobTicket),
}
