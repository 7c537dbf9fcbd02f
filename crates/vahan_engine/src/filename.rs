use vahan_core::Selection;

/// Marker distinguishing the synthesized all-pages artifacts from the raw
/// first-page fragment.
pub const ALL_PAGES_TAG: &str = "ALLPAGES";

/// `{y}_{x}_{year}.html` for the raw first-page fragment.
pub fn raw_fragment_filename(selection: &Selection) -> String {
    format!(
        "{}_{}_{}.html",
        sanitize_part(&selection.y.label),
        sanitize_part(&selection.x.label),
        sanitize_part(&selection.year.label)
    )
}

/// `{y}_{x}_ALLPAGES_{year}.{ext}` for the combined document and the CSV.
pub fn all_pages_filename(selection: &Selection, extension: &str) -> String {
    format!(
        "{}_{}_{ALL_PAGES_TAG}_{}.{extension}",
        sanitize_part(&selection.y.label),
        sanitize_part(&selection.x.label),
        sanitize_part(&selection.year.label)
    )
}

/// Spaces and path-hostile characters become underscores; runs of
/// underscores collapse; Windows device names get a trailing underscore.
pub fn sanitize_part(input: &str) -> String {
    let replaced: String = input
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || is_forbidden(c) { '_' } else { c })
        .collect();

    let mut compacted = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && compacted.ends_with('_') {
            continue;
        }
        compacted.push(c);
    }

    let mut name = compacted.trim_matches(&['_', '.'][..]).to_string();
    if name.is_empty() {
        name = "NA".to_string();
    }
    if name.chars().count() > 80 {
        name = name.chars().take(80).collect();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
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
