//! Small helpers shared by the sources, aggregator and renderer.

use chrono::Utc;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and a count of the dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error means the body ended early.
///
/// A feed file that is still being written by the generator shows up as an
/// EOF parse error rather than a syntax error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Query value that defeats intermediate HTTP caches (current unix millis).
pub fn cache_buster() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// 32-bit rolling hash of a title, used to pick a stable fallback image.
///
/// Runs `h = h * 31 + unit` over the UTF-16 code units with wrapping
/// arithmetic, so the same title always lands on the same image as it does
/// in the site's own script. An empty title hashes as `"default"`.
pub fn title_hash(title: &str) -> i32 {
    let title = if title.is_empty() { "default" } else { title };
    title.encode_utf16().fold(0i32, |hash, unit| {
        (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    })
}

/// Index into a list of `len` entries derived from [`title_hash`].
pub fn stable_index(title: &str, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(title_hash(title).unsigned_abs() as usize % len)
}
