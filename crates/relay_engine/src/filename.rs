const MAX_NAME_LEN: usize = 120;

/// Windows-safe local name for a downloaded artifact.
///
/// Directory components are stripped, forbidden characters replaced and the
/// stem capped in length; the extension is kept.
pub fn artifact_file_name(candidate: Option<&str>, fallback: &str) -> String {
    let base = candidate
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback);

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let mut stem = sanitize(stem);
    if stem.is_empty() {
        stem = sanitize(fallback);
    }
    if stem.is_empty() {
        stem = "download".to_string();
    }
    if stem.chars().count() > MAX_NAME_LEN {
        stem = stem.chars().take(MAX_NAME_LEN).collect();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }

    match extension.map(sanitize).filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn sanitize(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    compacted.trim_matches(&['_', ' ', '.'][..]).to_string()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// `filename="..."` from a Content-Disposition header value.
pub(crate) fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("filename")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(artifact_file_name(Some("report.pdf"), "x"), "report.pdf");
    }

    #[test]
    fn strips_directories_and_forbidden_characters() {
        assert_eq!(
            artifact_file_name(Some("../../etc/pass?wd.txt"), "x"),
            "pass_wd.txt"
        );
        assert_eq!(
            artifact_file_name(Some("C:\\temp\\a<b>.docx"), "x"),
            "a_b.docx"
        );
    }

    #[test]
    fn reserved_names_get_suffix() {
        assert_eq!(artifact_file_name(Some("con.pdf"), "x"), "con_.pdf");
    }

    #[test]
    fn empty_candidate_uses_fallback() {
        assert_eq!(artifact_file_name(Some("///"), "job-7"), "job-7");
        assert_eq!(artifact_file_name(None, "job-7"), "job-7");
    }

    #[test]
    fn long_stems_are_capped_but_keep_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let name = artifact_file_name(Some(&long), "x");
        assert_eq!(name.len(), MAX_NAME_LEN + 4);
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn reads_content_disposition() {
        assert_eq!(
            disposition_file_name("attachment; filename=\"merged.pdf\"").as_deref(),
            Some("merged.pdf")
        );
        assert_eq!(disposition_file_name("inline"), None);
    }
}
