//! Knowledge base search scraping.

use std::collections::HashSet;
use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use super::{DiscoveryError, FixDiscovery, RemoteArtifact};
use crate::events::Reporter;

fn upload_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?i)/upload[^"'\s]+\.(zip|rar)"#).unwrap())
}

fn unicode_escape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:\\u[0-9A-Fa-f]{4})+").unwrap())
}

/// Search term for a product version, e.g. `kpe_25.1.1.1`.
pub fn search_term(prefix: &str, version: &str) -> String {
    format!("{}{}", prefix, version)
}

/// Replace `\uXXXX` escapes with the characters they encode.
///
/// Runs of escapes are decoded together so surrogate pairs combine; an
/// unpaired surrogate becomes U+FFFD.
fn unescape_unicode(text: &str) -> String {
    unicode_escape_pattern()
        .replace_all(text, |caps: &Captures| {
            let units: Vec<u16> = caps[0]
                .split("\\u")
                .filter(|s| !s.is_empty())
                .filter_map(|hex| u16::from_str_radix(hex, 16).ok())
                .collect();
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect::<String>()
        })
        .into_owned()
}

fn last_segment(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Extract fix package descriptors from a raw search response.
///
/// Matches are unescaped (`\uXXXX` and JSON `\/`), percent-decoded, and
/// deduplicated by URL keeping the first occurrence.
///
/// ```
/// use fixsync::discovery::extract_artifacts;
///
/// let body = r#"<a href="/upload/iblock/a1/kpe_25.1.1.1_3.zip">fix</a>
///               {"file":"\/upload\/iblock\/b2\/kpe_25.1.1.1_%D0%B4%D0%BE%D0%BF4.rar"}
///               <a href='/upload/iblock/a1/kpe_25.1.1.1_3.zip'>dup</a>"#;
/// let found = extract_artifacts(body, "25.1.1.1");
/// assert_eq!(found.len(), 2);
/// assert_eq!(found[0].name, "kpe_25.1.1.1_3.zip");
/// assert_eq!(found[1].name, "kpe_25.1.1.1_доп4.rar");
/// assert_eq!(found[1].url, "/upload/iblock/b2/kpe_25.1.1.1_доп4.rar");
/// ```
pub fn extract_artifacts(body: &str, version: &str) -> Vec<RemoteArtifact> {
    let mut seen = HashSet::new();
    let mut artifacts = Vec::new();

    for m in upload_link_pattern().find_iter(body) {
        let raw = m.as_str();
        let unescaped = unescape_unicode(raw).replace("\\/", "/");
        let decoded = percent_decode_str(&unescaped)
            .decode_utf8_lossy()
            .into_owned();
        debug!(raw, decoded = %decoded, "matched upload link");

        if !seen.insert(decoded.clone()) {
            continue;
        }
        artifacts.push(RemoteArtifact {
            name: last_segment(&decoded).to_string(),
            url: decoded,
            version: version.to_string(),
        });
    }

    artifacts
}

/// Fix package discovery through the support site search.
#[derive(Debug, Clone)]
pub struct WebSearchDiscovery {
    client: Client,
    search_url: String,
    kb: String,
    prefix: String,
}

impl WebSearchDiscovery {
    pub fn new(
        client: Client,
        search_url: impl Into<String>,
        kb: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            kb: kb.into(),
            prefix: prefix.into(),
        }
    }

    /// Full search request URL for `version`.
    pub fn request_url(&self, version: &str) -> Result<Url, DiscoveryError> {
        let term = search_term(&self.prefix, version);
        Url::parse_with_params(
            &self.search_url,
            &[
                ("kb", self.kb.as_str()),
                ("term", term.as_str()),
                ("from", ""),
                ("to", ""),
            ],
        )
        .map_err(|e| DiscoveryError::InvalidUrl {
            url: self.search_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Search and extract, surfacing failures.
    pub fn try_discover(
        &self,
        version: &str,
        reporter: &Reporter,
    ) -> Result<Vec<RemoteArtifact>, DiscoveryError> {
        let url = self.request_url(version)?;
        reporter.info(format!("Searching fix packages for version {}", version));
        debug!(url = %url, "search request");

        let http_error = |e: reqwest::Error| DiscoveryError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self.client.get(url.clone()).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(http_error)?;
        debug!(length = body.len(), "search response received");

        let artifacts = extract_artifacts(&body, version);
        if artifacts.is_empty() {
            reporter.warn(format!(
                "No fix packages found for version {} on the support site",
                version
            ));
        } else {
            reporter.info(format!("Found {} fix package(s)", artifacts.len()));
        }
        Ok(artifacts)
    }
}

impl FixDiscovery for WebSearchDiscovery {
    fn discover(&self, version: &str, reporter: &Reporter) -> Vec<RemoteArtifact> {
        self.try_discover(version, reporter).unwrap_or_else(|e| {
            reporter.error(format!("Fix package search failed: {}", e));
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_search_term() {
        assert_eq!(search_term("kpe_", "25.1.1.1"), "kpe_25.1.1.1");
    }

    #[test]
    fn test_request_url_has_empty_range_params() {
        let discovery = WebSearchDiscovery::new(
            Client::new(),
            "https://support.example/kb/search.php",
            "fns",
            "kpe_",
        );
        let url = discovery.request_url("25.1.1.1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://support.example/kb/search.php?kb=fns&term=kpe_25.1.1.1&from=&to="
        );
    }

    #[test]
    fn test_extract_is_case_insensitive() {
        let found = extract_artifacts(r#"href="/UPLOAD/a/KPE_25.1.1.1_2.ZIP""#, "25.1.1.1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "KPE_25.1.1.1_2.ZIP");
    }

    #[test]
    fn test_extract_stops_at_quotes_and_whitespace() {
        let found = extract_artifacts(
            "x /upload/a b.zip y \"/upload/c'd.rar\"",
            "1.1.1.1",
        );
        // "/upload/a b.zip" breaks at the space, "/upload/c'd.rar" at the quote.
        assert!(found.is_empty());
    }

    #[test]
    fn test_unicode_escapes_are_decoded() {
        assert_eq!(unescape_unicode(r"\u0434\u043e\u043f"), "доп");
        assert_eq!(unescape_unicode(r"a\u002Fb"), "a/b");
        assert_eq!(unescape_unicode(r"\uD83D\uDE00"), "\u{1F600}");
        assert_eq!(unescape_unicode(r"\uD83Dx"), "\u{FFFD}x");
    }

    #[test]
    fn test_json_escaped_slashes_are_normalized() {
        let found = extract_artifacts(r#"{"f":"\/upload\/b\/kpe_1.1.1.1_\u0444\u0438\u043a\u04415.rar"}"#, "1.1.1.1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "/upload/b/kpe_1.1.1.1_фикс5.rar");
        assert_eq!(found[0].name, "kpe_1.1.1.1_фикс5.rar");
    }

    #[test]
    fn test_duplicates_keep_first() {
        let body = "/upload/x/a_1.1.1.1_1.zip /upload/x/a_1.1.1.1_1.zip /upload/y/a_1.1.1.1_2.zip";
        let found = extract_artifacts(body, "1.1.1.1");
        let urls: Vec<_> = found.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, ["/upload/x/a_1.1.1.1_1.zip", "/upload/y/a_1.1.1.1_2.zip"]);
    }

    #[test]
    fn test_unreachable_host_yields_empty() {
        let client = Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let discovery = WebSearchDiscovery::new(client, "http://127.0.0.1:9/search.php", "fns", "kpe_");
        let found = discovery.discover("25.1.1.1", &Reporter::silent());
        assert!(found.is_empty());
    }
}
