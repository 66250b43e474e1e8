//! Dotted numeric version ordering.
//!
//! Versions on the mirror and support site look like `25.9.30.1`, but folder
//! names mix separators (`25_9_30_1`, `AIS_25.9.30.1_release`), so a version
//! is first located inside the string and normalized to dots.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

fn embedded_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+[._]\d+[._]\d+[._]\d+").unwrap())
}

fn strict_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").unwrap())
}

fn segments(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|s| s.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two dotted version strings segment by segment.
///
/// Non-numeric segments count as 0, and a missing trailing segment counts
/// as 0, so `1.2` equals `1.2.0.0`.
///
/// ```
/// use std::cmp::Ordering;
/// use fixsync::archive::compare_versions;
///
/// assert_eq!(compare_versions("25.9.30.1", "25.9.30.0"), Ordering::Greater);
/// assert_eq!(compare_versions("25.10.0.0", "25.9.99.99"), Ordering::Greater);
/// assert_eq!(compare_versions("1.2", "1.2.0.0"), Ordering::Equal);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);
    let len = left.len().max(right.len());

    (0..len)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0);
            let r = right.get(i).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Locate a four-segment version inside an arbitrary name.
///
/// Accepts `.` or `_` separators and returns the dotted form.
///
/// ```
/// use fixsync::archive::find_version;
///
/// assert_eq!(find_version("OE_25_9_30_1").as_deref(), Some("25.9.30.1"));
/// assert_eq!(find_version("release-25.10.1.0-final").as_deref(), Some("25.10.1.0"));
/// assert_eq!(find_version("archive"), None);
/// ```
pub fn find_version(name: &str) -> Option<String> {
    embedded_version_pattern()
        .find(name)
        .map(|m| m.as_str().replace('_', "."))
}

/// Whether a string is exactly a four-segment dotted version.
pub fn is_valid_version(version: &str) -> bool {
    strict_version_pattern().is_match(version.trim())
}
