use std::path::PathBuf;

use thiserror::Error;

use crate::config::ToolConfig;

/// A file the user offered for staging, before any checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, size_bytes: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{name} has no file extension. Allowed types: {allowed}")]
    MissingExtension { name: String, allowed: String },
    #[error("{name}: .{extension} files are not supported. Allowed types: {allowed}")]
    UnsupportedExtension {
        name: String,
        extension: String,
        allowed: String,
    },
    #[error("{name} is empty")]
    Empty { name: String },
    #[error("{name} is {size}, which exceeds the {limit} limit")]
    TooLarge {
        name: String,
        size: String,
        limit: String,
    },
}

/// Checks a candidate against the tool's accepted extensions and size limit.
pub fn validate(candidate: &FileCandidate, tool: &ToolConfig) -> Result<(), Rejection> {
    let allowed = || allowed_list(tool);
    let extension = file_extension(&candidate.name).ok_or_else(|| Rejection::MissingExtension {
        name: candidate.name.clone(),
        allowed: allowed(),
    })?;

    if !tool.accepts_extension(&extension) {
        return Err(Rejection::UnsupportedExtension {
            name: candidate.name.clone(),
            extension,
            allowed: allowed(),
        });
    }

    if candidate.size_bytes == 0 {
        return Err(Rejection::Empty {
            name: candidate.name.clone(),
        });
    }

    if candidate.size_bytes > tool.max_bytes {
        return Err(Rejection::TooLarge {
            name: candidate.name.clone(),
            size: format_bytes(candidate.size_bytes),
            limit: format_bytes(tool.max_bytes),
        });
    }

    Ok(())
}

/// Lowercase trailing extension, if the name has a non-empty stem and suffix.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, extension) = name.trim().rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Human readable byte count using binary units, e.g. `50 MB` or `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0} {}", UNITS[unit])
    } else {
        format!("{rounded:.1} {}", UNITS[unit])
    }
}

fn allowed_list(tool: &ToolConfig) -> String {
    tool.accepted_extensions
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolMode;

    fn pdf_tool() -> ToolConfig {
        ToolConfig::new("merge_pdf", ToolMode::Merge, "/merge/", &["pdf"]).with_max_bytes(1024 * 1024)
    }

    #[test]
    fn extension_is_lowercased_trailing_suffix() {
        assert_eq!(file_extension("Report.Final.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn bytes_are_formatted_with_binary_units() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50 MB");
    }

    #[test]
    fn rejects_unsupported_extension_naming_allowed_set() {
        let err = validate(&FileCandidate::new("notes.txt", 10, "notes.txt"), &pdf_tool()).unwrap_err();
        assert_eq!(err.to_string(), "notes.txt: .txt files are not supported. Allowed types: .pdf");
    }

    #[test]
    fn rejects_oversized_file_with_readable_limit() {
        let err = validate(&FileCandidate::new("big.pdf", 2 * 1024 * 1024, "big.pdf"), &pdf_tool())
            .unwrap_err();
        assert_eq!(err.to_string(), "big.pdf is 2 MB, which exceeds the 1 MB limit");
    }

    #[test]
    fn accepts_file_at_exact_limit() {
        let candidate = FileCandidate::new("edge.PDF", 1024 * 1024, "edge.PDF");
        assert_eq!(validate(&candidate, &pdf_tool()), Ok(()));
    }

    #[test]
    fn rejects_empty_file() {
        let err = validate(&FileCandidate::new("empty.pdf", 0, "empty.pdf"), &pdf_tool()).unwrap_err();
        assert_eq!(err, Rejection::Empty { name: "empty.pdf".to_string() });
    }
}
