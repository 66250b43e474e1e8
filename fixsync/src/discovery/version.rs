//! Product version resolution.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::debug;

use super::{DiscoveryError, VersionSource};

/// Marker of the footer line naming the product release.
const PRODUCT_MARKER: &str = "КПЭ АИС";

fn block_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)</?(?:li|p|div|ul|ol|tr|td|br|footer|h[1-6])\b[^>]*>").unwrap()
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn dotted_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").unwrap())
}

/// Find the product version in a knowledge base page.
///
/// Block tags become line breaks and inline tags are dropped; the first
/// text line mentioning the product marker that carries a `d.d.d.d`
/// version wins.
pub fn find_product_version(page: &str) -> Option<String> {
    let text = block_tag_pattern().replace_all(page, "\n");
    let text = tag_pattern().replace_all(&text, "");
    text.lines()
        .filter(|line| line.contains(PRODUCT_MARKER))
        .find_map(|line| dotted_version_pattern().find(line))
        .map(|m| m.as_str().to_string())
}

/// Version read from the support site footer.
#[derive(Debug, Clone)]
pub struct SupportSiteVersion {
    client: Client,
    page_url: String,
}

impl SupportSiteVersion {
    pub fn new(client: Client, page_url: impl Into<String>) -> Self {
        Self {
            client,
            page_url: page_url.into(),
        }
    }
}

impl VersionSource for SupportSiteVersion {
    fn resolve(&self) -> Result<String, DiscoveryError> {
        let http_error = |e: reqwest::Error| DiscoveryError::Http {
            url: self.page_url.clone(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .get(&self.page_url)
            .send()
            .map_err(http_error)?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                url: self.page_url.clone(),
                status: response.status().as_u16(),
            });
        }
        let page = response.text().map_err(http_error)?;
        debug!(length = page.len(), "version page received");

        find_product_version(&page)
            .ok_or_else(|| DiscoveryError::VersionNotFound(self.page_url.clone()))
    }
}

/// A version fixed in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVersion(pub String);

impl VersionSource for FixedVersion {
    fn resolve(&self) -> Result<String, DiscoveryError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOTER: &str = r#"
        <footer class="footer"><div class="footer__text-container">
          <ul class="footer__text-ul">
            <li class="footer__text">Версия портала 3.1.0.7</li>
            <li class="footer__text">Актуальная версия КПЭ АИС &laquo;Налог-3&raquo;: <b>25.9.30.1</b></li>
          </ul>
        </div></footer>"#;

    #[test]
    fn test_finds_version_on_marker_line() {
        assert_eq!(find_product_version(FOOTER).as_deref(), Some("25.9.30.1"));
    }

    #[test]
    fn test_marker_and_version_on_same_text_line() {
        let page = "<li>КПЭ АИС «Налог-3» 25.10.2.0</li><li>other 1.2.3.4</li>";
        assert_eq!(find_product_version(page).as_deref(), Some("25.10.2.0"));
    }

    #[test]
    fn test_unrelated_versions_are_ignored() {
        let page = "<li>Версия портала 3.1.0.7</li><li>КПЭ АИС</li>";
        assert_eq!(find_product_version(page), None);
    }

    #[test]
    fn test_fixed_version() {
        assert_eq!(FixedVersion("1.2.3.4".into()).resolve().unwrap(), "1.2.3.4");
    }
}
