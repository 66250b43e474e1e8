//! Download URL resolution.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use super::TransferError;

fn repeated_slashes() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/+").unwrap())
}

fn collapse_slashes(path: &str) -> String {
    repeated_slashes().replace_all(path, "/").into_owned()
}

fn has_known_scheme(raw: &str) -> bool {
    ["http://", "https://", "ftp://"].iter().any(|scheme| {
        raw.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

/// Resolve a scraped path against the support host.
///
/// Absolute URLs keep their scheme and host; relative paths take both from
/// `base`. Duplicate slashes in the path are collapsed either way, and a
/// relative path always gains a leading `/`.
///
/// ```
/// use fixsync::transfer::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://support.example").unwrap();
/// let url = resolve_url(&base, "upload//iblock/kpe_25.1.1.1_3.zip").unwrap();
/// assert_eq!(url.as_str(), "https://support.example/upload/iblock/kpe_25.1.1.1_3.zip");
/// ```
pub fn resolve_url(base: &Url, raw: &str) -> Result<Url, TransferError> {
    let invalid = |reason: String| TransferError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("empty path".to_string()));
    }

    if has_known_scheme(raw) {
        let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let path = collapse_slashes(url.path());
        url.set_path(&path);
        return Ok(url);
    }

    let mut path = collapse_slashes(raw);
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    let mut url = base.clone();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
