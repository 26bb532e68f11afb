use std::time::Duration;

/// Upload limit applied when a tool does not declare its own.
pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// How a tool stages its input and what it needs before it can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// Several files combined into one artifact; needs at least two.
    Merge,
    /// One document whose pages are picked individually; needs one selected page.
    PageExtract,
    /// Exactly one file converted or compressed.
    SingleFile,
}

impl ToolMode {
    /// Multipart field name the backend expects the binary parts under.
    pub fn file_field(self) -> &'static str {
        match self {
            ToolMode::Merge => "files",
            ToolMode::PageExtract | ToolMode::SingleFile => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub slug: String,
    pub mode: ToolMode,
    /// Submission path, relative to the server base url.
    pub endpoint: String,
    /// Lowercase extensions without the leading dot.
    pub accepted_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl ToolConfig {
    pub fn new(
        slug: impl Into<String>,
        mode: ToolMode,
        endpoint: impl Into<String>,
        extensions: &[&str],
    ) -> Self {
        Self {
            slug: slug.into(),
            mode,
            endpoint: endpoint.into(),
            accepted_extensions: extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        self.accepted_extensions
            .iter()
            .any(|allowed| normalize_extension(allowed) == extension)
    }
}

/// Lowercases an extension and strips any leading dots.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Tools known to the backend out of the box.
pub fn builtin_tools() -> Vec<ToolConfig> {
    const IMAGES: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];
    vec![
        ToolConfig::new("merge_pdf", ToolMode::Merge, "/api/v1/tools/merge-pdf/", &["pdf"]),
        ToolConfig::new("split_pdf", ToolMode::PageExtract, "/api/v1/tools/split-pdf/", &["pdf"]),
        ToolConfig::new("compress_pdf", ToolMode::SingleFile, "/api/v1/tools/compress-pdf/", &["pdf"]),
        ToolConfig::new("pdf_to_docx", ToolMode::SingleFile, "/api/v1/tools/pdf-to-docx/", &["pdf"]),
        ToolConfig::new("docx_to_pdf", ToolMode::SingleFile, "/api/v1/tools/docx-to-pdf/", &["doc", "docx"]),
        ToolConfig::new("xlsx_to_pdf", ToolMode::SingleFile, "/api/v1/tools/xlsx-to-pdf/", &["xls", "xlsx"]),
        ToolConfig::new("pptx_to_pdf", ToolMode::SingleFile, "/api/v1/tools/pptx-to-pdf/", &["ppt", "pptx"]),
        ToolConfig::new("image_to_pdf", ToolMode::SingleFile, "/api/v1/tools/image-to-pdf/", IMAGES),
        ToolConfig::new("compress_image", ToolMode::SingleFile, "/api/v1/tools/compress-image/", IMAGES),
        ToolConfig::new("compress_video", ToolMode::SingleFile, "/api/v1/tools/compress-video/", &["mp4", "mov", "avi", "mkv", "webm"])
            .with_max_bytes(500 * 1024 * 1024),
    ]
}

pub fn find_tool<'a>(tools: &'a [ToolConfig], slug: &str) -> Option<&'a ToolConfig> {
    tools.iter().find(|tool| tool.slug.eq_ignore_ascii_case(slug))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Status queries allowed before the job is reported as timed out.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeConfig {
    pub dismiss_after: Duration,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            dismiss_after: Duration::from_secs(5),
        }
    }
}

/// Everything one staging session needs, passed in explicitly at mount time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub tool: ToolConfig,
    pub poll: PollConfig,
    pub notices: NoticeConfig,
}

impl SessionConfig {
    pub fn new(tool: ToolConfig) -> Self {
        Self {
            tool,
            poll: PollConfig::default(),
            notices: NoticeConfig::default(),
        }
    }
}
