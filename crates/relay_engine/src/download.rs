use std::path::PathBuf;

use futures_util::StreamExt;
use relay_logging::relay_info;
use reqwest::header::CONTENT_DISPOSITION;
use thiserror::Error;

use crate::client::{ClientSettings, ReqwestApi};
use crate::filename::{artifact_file_name, disposition_file_name};
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid download url: {0}")]
    InvalidUrl(String),
    #[error("download failed with http status {0}")]
    HttpStatus(u16),
    #[error("download failed: {0}")]
    Network(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Fetches finished artifacts into an output directory.
pub struct ArtifactDownloader {
    client: reqwest::Client,
    settings: ClientSettings,
    writer: AtomicFileWriter,
}

impl ArtifactDownloader {
    pub fn new(api: &ReqwestApi, output_dir: PathBuf) -> Self {
        Self {
            client: api.http().clone(),
            settings: api.settings().clone(),
            writer: AtomicFileWriter::new(output_dir),
        }
    }

    pub async fn download(&self, locator: &str) -> Result<PathBuf, DownloadError> {
        let url = self
            .settings
            .resolve(locator)
            .map_err(|err| DownloadError::InvalidUrl(err.to_string()))?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| DownloadError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        let from_header = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name);
        let from_url = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string);
        let file_name = artifact_file_name(from_header.or(from_url).as_deref(), "download");

        let mut pending = self.writer.begin(&file_name)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| DownloadError::Network(err.to_string()))?;
            pending.write_chunk(&chunk)?;
        }
        let written = pending.bytes_written();
        let path = pending.commit()?;
        relay_info!("Saved {} ({} bytes)", path.display(), written);
        Ok(path)
    }
}
