use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::ARCHIVE_TYPE_LIMIT;
use crate::model::MediaKind;

static RESERVED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).unwrap());
static SPACE_COLLAPSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// `voice_{character}_{category}` plus `_` and at most five type ids joined
/// by commas when a type filter is active.
pub fn archive_name(character_id: &str, category: &str, types: &[String]) -> String {
    let type_suffix = if types.is_empty() {
        String::new()
    } else {
        let shown: Vec<&str> = types
            .iter()
            .take(ARCHIVE_TYPE_LIMIT)
            .map(String::as_str)
            .collect();
        format!("_{}", shown.join(","))
    };
    format!("voice_{character_id}_{category}{type_suffix}.zip")
}

/// Save name for a single clip: its title plus the media extension.
pub fn clip_file_name(title: &str, kind: MediaKind) -> String {
    format!("{}.{}", sanitize_stem(title), kind.extension())
}

/// Makes a title usable as a file or archive entry name.
pub fn sanitize_stem(title: &str) -> String {
    let collapsed = SPACE_COLLAPSE.replace_all(title.trim(), " ");
    let replaced = RESERVED_CHARS.replace_all(&collapsed, "_");
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "voice".to_string()
    } else {
        trimmed.to_string()
    }
}
