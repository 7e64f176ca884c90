//! URL utilities: video-ID pattern matching, cleaning, domain extraction.

use std::sync::LazyLock;

use regex::Regex;

/// Known YouTube link shapes, in priority order. First match wins.
/// Video IDs are always 11 characters of `[A-Za-z0-9_-]`.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/v/([A-Za-z0-9_-]{11})",
        r"youtube\.com/vi/([A-Za-z0-9_-]{11})",
        r"youtube\.com/\?v=([A-Za-z0-9_-]{11})",
        r"youtube\.com/\?vi=([A-Za-z0-9_-]{11})",
        r"youtube\.com/watch\?v=([A-Za-z0-9_-]{11})",
        r"youtube\.com/watch\?vi=([A-Za-z0-9_-]{11})",
        r"youtu\.be/([A-Za-z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Try each known video-link pattern against `url` and return the embedded
/// video ID of the first match, or `None` if no pattern applies.
pub fn parse_video_id(url: &str) -> Option<String> {
    for regex in VIDEO_ID_PATTERNS.iter() {
        if let Some(captures) = regex.captures(url) {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// Prepend `http://` when the scheme is missing and trim whitespace.
/// Post bodies routinely carry bare `www.example.com/...` links.
pub fn clean_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Extract the registrable domain (last two host labels) from a URL.
/// Returns `None` for unparseable URLs or hostless schemes.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(&clean_url(url)).ok()?;
    let host = parsed.host_str()?;
    let labels: Vec<&str> = host.rsplit('.').take(2).collect();
    if labels.len() < 2 {
        return Some(host.to_string());
    }
    Some(format!("{}.{}", labels[1], labels[0]))
}
