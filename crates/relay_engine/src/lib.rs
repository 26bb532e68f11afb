//! Relay engine: executes core effects against the conversion server and the
//! local filesystem.
mod client;
mod document;
mod download;
mod filename;
mod persist;
mod runtime;
mod types;
mod wire;

pub use client::{
    ChannelProgressSink, ClientSettings, ConversionApi, ProgressSink, ReqwestApi,
    UPLOAD_FAILED_MESSAGE,
};
pub use document::{count_pages, DocumentError};
pub use download::{ArtifactDownloader, DownloadError};
pub use filename::artifact_file_name;
pub use persist::{ensure_output_dir, AtomicFileWriter, PendingFile, PersistError};
pub use runtime::{EngineError, EngineHandle};
pub use types::{EngineEvent, FailureKind, StatusError, SubmitError};
