//! Tool catalog files.
//!
//! A catalog is a RON document listing the tools a server offers. It replaces
//! the built-in list entirely when given.
use std::fs;
use std::path::Path;

use relay_core::{builtin_tools, ToolConfig, ToolMode, DEFAULT_MAX_BYTES};
use relay_logging::relay_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse catalog {path}: {message}")]
    Parse { path: String, message: String },
    #[error("catalog entry `{0}` accepts no file types")]
    NoExtensions(String),
    #[error("catalog lists `{0}` more than once")]
    DuplicateSlug(String),
    #[error("could not serialize catalog: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ModeEntry {
    Merge,
    PageExtract,
    SingleFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolEntry {
    slug: String,
    mode: ModeEntry,
    endpoint: String,
    extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_mb: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CatalogFile {
    tools: Vec<ToolEntry>,
}

pub fn load_catalog(path: &Path) -> Result<Vec<ToolConfig>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let tools = parse_catalog(&content).map_err(|err| match err {
        CatalogError::Parse { message, .. } => CatalogError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })?;
    relay_info!("Loaded {} tool(s) from {:?}", tools.len(), path);
    Ok(tools)
}

pub fn parse_catalog(content: &str) -> Result<Vec<ToolConfig>, CatalogError> {
    let file: CatalogFile = ron::from_str(content).map_err(|err| CatalogError::Parse {
        path: "<inline>".to_string(),
        message: err.to_string(),
    })?;

    let mut tools: Vec<ToolConfig> = Vec::with_capacity(file.tools.len());
    for entry in file.tools {
        if entry.extensions.is_empty() {
            return Err(CatalogError::NoExtensions(entry.slug));
        }
        if tools.iter().any(|tool| tool.slug.eq_ignore_ascii_case(&entry.slug)) {
            return Err(CatalogError::DuplicateSlug(entry.slug));
        }
        let extensions: Vec<&str> = entry.extensions.iter().map(String::as_str).collect();
        let max_bytes = entry.max_mb.map(|mb| mb * MIB).unwrap_or(DEFAULT_MAX_BYTES);
        tools.push(
            ToolConfig::new(entry.slug, mode_from(entry.mode), entry.endpoint, &extensions)
                .with_max_bytes(max_bytes),
        );
    }
    Ok(tools)
}

/// The built-in catalog as RON, a starting point for custom files.
pub fn builtin_catalog_ron() -> Result<String, CatalogError> {
    let file = CatalogFile {
        tools: builtin_tools()
            .into_iter()
            .map(|tool| ToolEntry {
                slug: tool.slug,
                mode: mode_to(tool.mode),
                endpoint: tool.endpoint,
                extensions: tool.accepted_extensions,
                max_mb: (tool.max_bytes != DEFAULT_MAX_BYTES).then_some(tool.max_bytes / MIB),
            })
            .collect(),
    };
    let pretty = ron::ser::PrettyConfig::new();
    ron::ser::to_string_pretty(&file, pretty).map_err(|err| CatalogError::Serialize(err.to_string()))
}

fn mode_from(mode: ModeEntry) -> ToolMode {
    match mode {
        ModeEntry::Merge => ToolMode::Merge,
        ModeEntry::PageExtract => ToolMode::PageExtract,
        ModeEntry::SingleFile => ToolMode::SingleFile,
    }
}

fn mode_to(mode: ToolMode) -> ModeEntry {
    match mode {
        ToolMode::Merge => ModeEntry::Merge,
        ToolMode::PageExtract => ModeEntry::PageExtract,
        ToolMode::SingleFile => ModeEntry::SingleFile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn parses_entries_with_optional_limit() {
        let tools = parse_catalog(
            r#"(
                tools: [
                    (slug: "ocr_pdf", mode: SingleFile, endpoint: "/api/v1/tools/ocr/", extensions: ["pdf", ".PNG"]),
                    (slug: "merge_big", mode: Merge, endpoint: "/merge/", extensions: ["pdf"], max_mb: Some(200)),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].accepted_extensions, vec!["pdf", "png"]);
        assert_eq!(tools[0].max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(tools[1].mode, ToolMode::Merge);
        assert_eq!(tools[1].max_bytes, 200 * MIB);
    }

    #[test]
    fn builtin_catalog_survives_a_trip_through_a_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tools.ron");
        fs::write(&path, builtin_catalog_ron().unwrap()).unwrap();
        assert_eq!(load_catalog(&path).unwrap(), builtin_tools());
    }

    #[test]
    fn rejects_duplicates_and_empty_extension_lists() {
        let dup = r#"(tools: [
            (slug: "a", mode: SingleFile, endpoint: "/a/", extensions: ["pdf"]),
            (slug: "A", mode: SingleFile, endpoint: "/b/", extensions: ["pdf"]),
        ])"#;
        assert!(matches!(parse_catalog(dup), Err(CatalogError::DuplicateSlug(_))));

        let empty = r#"(tools: [(slug: "a", mode: Merge, endpoint: "/a/", extensions: [])])"#;
        assert!(matches!(parse_catalog(empty), Err(CatalogError::NoExtensions(_))));
    }

    #[test]
    fn reports_path_of_broken_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.ron");
        fs::write(&path, "(tools: [").unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(err.to_string().contains("broken.ron"));
    }
}
