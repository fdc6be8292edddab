use std::sync::LazyLock;

use regex::Regex;

/// Tried in order; the first capture group of the first match is the id.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com/watch\?(?:[^#\s]*&)?v=)([^&\s?#/]+)",
        r"(?:youtu\.be/)([^&\s?#/]+)",
        r"(?:youtube\.com/embed/)([^&\s?#/]+)",
        r"(?:youtube\.com/shorts/)([^&\s?#/]+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Extract the video id from a YouTube URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
