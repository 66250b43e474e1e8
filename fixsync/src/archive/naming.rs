//! Fix package filename parsing.
//!
//! Publishers name fix archives as `<text>_<d>.<d>.<d>.<d><noise>.<ext>`,
//! where the noise after the version is entered by hand and varies wildly:
//!
//! - `kpe_25.1.1.1_3.zip`
//! - `kpe_25.1.1.1_garbage3.zip`
//! - `kpe_25.1.1.1_№_№4.rar`
//! - `kpe_25.1.1.1_##1__.zip`
//!
//! The version-bearing prefix (`kpe_25.1.1.1`) is the *family*; the last run
//! of decimal digits in the noise is the *sequence number*.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::ArchiveFormat;

/// Parsed identity of a fix archive filename.
///
/// Ordering is `(family, sequence)`, which is the order archives must be
/// merged in. Keys from different families are never merged together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveKey {
    /// Text-plus-version prefix, e.g. `kpe_25.1.1.1`.
    pub family: String,
    /// Per-family fix counter.
    pub sequence: u32,
}

impl ArchiveKey {
    /// Create a key from its parts.
    pub fn new(family: impl Into<String>, sequence: u32) -> Self {
        Self {
            family: family.into(),
            sequence,
        }
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.family, self.sequence)
    }
}

/// Error parsing an archive filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    /// No `<text>_<d>.<d>.<d>.<d>` prefix in the name.
    MissingVersionPrefix,
    /// The text after the version prefix holds no digits.
    MissingSequenceNumber,
    /// The sequence digits do not fit the counter type.
    SequenceOutOfRange(String),
}

impl fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVersionPrefix => write!(f, "no versioned prefix in filename"),
            Self::MissingSequenceNumber => write!(f, "no sequence number after version"),
            Self::SequenceOutOfRange(s) => write!(f, "sequence number out of range: {}", s),
        }
    }
}

impl std::error::Error for KeyParseError {}

fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Greedy leading `.*` picks the last `_d.d.d.d` that still leaves a valid split.
    PATTERN.get_or_init(|| Regex::new(r"^(.*_\d+\.\d+\.\d+\.\d+)(.*)$").unwrap())
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Strip a known archive extension, if any.
fn strip_archive_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if ArchiveFormat::from_extension(ext).is_some() => stem,
        _ => name,
    }
}

/// Parse an archive filename (with or without extension) into its key.
///
/// # Examples
///
/// ```
/// use fixsync::archive::{parse_archive_key, ArchiveKey};
///
/// assert_eq!(
///     parse_archive_key("kpe_25.1.1.1_garbage3.zip").unwrap(),
///     ArchiveKey::new("kpe_25.1.1.1", 3)
/// );
/// // Only the last digit run after the version counts.
/// assert_eq!(
///     parse_archive_key("kpe_25.1.1.1_copy2_fix11").unwrap().sequence,
///     11
/// );
/// assert!(parse_archive_key("kpe_25.1.1_3.zip").is_err());
/// assert!(parse_archive_key("kpe_25.1.1.1_final.zip").is_err());
/// ```
pub fn parse_archive_key(name: &str) -> Result<ArchiveKey, KeyParseError> {
    let stem = strip_archive_extension(name);

    let captures = prefix_pattern()
        .captures(stem)
        .ok_or(KeyParseError::MissingVersionPrefix)?;

    let family = captures.get(1).map_or("", |m| m.as_str());
    let suffix = captures.get(2).map_or("", |m| m.as_str());

    let digits = digits_pattern()
        .find_iter(suffix)
        .last()
        .ok_or(KeyParseError::MissingSequenceNumber)?
        .as_str();

    let sequence = digits
        .parse::<u32>()
        .map_err(|_| KeyParseError::SequenceOutOfRange(digits.to_string()))?;

    Ok(ArchiveKey::new(family, sequence))
}

/// Canonical on-disk filename for a key: `family_sequence.ext`.
///
/// ```
/// use fixsync::archive::{canonical_file_name, ArchiveFormat, ArchiveKey};
///
/// let key = ArchiveKey::new("kpe_25.1.1.1", 7);
/// assert_eq!(canonical_file_name(&key, ArchiveFormat::Rar), "kpe_25.1.1.1_7.rar");
/// ```
pub fn canonical_file_name(key: &ArchiveKey, format: ArchiveFormat) -> String {
    format!("{}.{}", key, format.extension())
}

/// An archive file on disk together with its parsed identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArchive {
    /// Current location of the file.
    pub path: PathBuf,
    /// Parsed identity.
    pub key: ArchiveKey,
    /// Archive format from the extension.
    pub format: ArchiveFormat,
}

impl ParsedArchive {
    /// Parse a path; fails if the extension is unknown or the name has no key.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = ArchiveFormat::from_path(&path)?;
        let name = path.file_name()?.to_str()?;
        let key = parse_archive_key(name).ok()?;
        Some(Self { path, key, format })
    }

    /// Filename component of the current path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Canonical filename for this archive.
    pub fn canonical_name(&self) -> String {
        canonical_file_name(&self.key, self.format)
    }

    /// Whether the file already carries its canonical name.
    pub fn is_canonical(&self) -> bool {
        self.file_name().eq_ignore_ascii_case(&self.canonical_name())
    }

    /// Canonical path next to the current file.
    pub fn canonical_path(&self) -> PathBuf {
        self.path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(self.canonical_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_clean_name() {
        let key = parse_archive_key("kpe_25.1.1.1_3.zip").unwrap();
        assert_eq!(key.family, "kpe_25.1.1.1");
        assert_eq!(key.sequence, 3);
    }

    #[test]
    fn test_parse_without_extension() {
        let key = parse_archive_key("kpe_25.1.1.1_zz7").unwrap();
        assert_eq!(key, ArchiveKey::new("kpe_25.1.1.1", 7));
    }

    #[test]
    fn test_parse_unicode_noise() {
        let key = parse_archive_key("kpe_22.12.26.1_№_№4.rar").unwrap();
        assert_eq!(key, ArchiveKey::new("kpe_22.12.26.1", 4));
    }

    #[test]
    fn test_parse_takes_last_digit_run() {
        let key = parse_archive_key("kpe_25.1.1.1_(2)_fix_15.zip").unwrap();
        assert_eq!(key.sequence, 15);
    }

    #[test]
    fn test_parse_leading_zeros() {
        let key = parse_archive_key("kpe_25.1.1.1_007.zip").unwrap();
        assert_eq!(key.sequence, 7);
    }

    #[test]
    fn test_parse_missing_prefix() {
        assert_eq!(
            parse_archive_key("readme_3.zip"),
            Err(KeyParseError::MissingVersionPrefix)
        );
        assert_eq!(
            parse_archive_key("kpe25.1.1.1_3.zip"),
            Err(KeyParseError::MissingVersionPrefix)
        );
    }

    #[test]
    fn test_parse_missing_sequence() {
        assert_eq!(
            parse_archive_key("kpe_25.1.1.1.zip"),
            Err(KeyParseError::MissingSequenceNumber)
        );
        assert_eq!(
            parse_archive_key("kpe_25.1.1.1_final.rar"),
            Err(KeyParseError::MissingSequenceNumber)
        );
    }

    #[test]
    fn test_parse_sequence_overflow() {
        assert!(matches!(
            parse_archive_key("kpe_25.1.1.1_99999999999.zip"),
            Err(KeyParseError::SequenceOutOfRange(_))
        ));
    }

    #[test]
    fn test_unknown_extension_is_kept_in_suffix() {
        // `.7z` is not a known extension, so its digit becomes the last run.
        let key = parse_archive_key("kpe_25.1.1.1_3.7z").unwrap();
        assert_eq!(key.sequence, 7);
    }

    #[test]
    fn test_keys_order_by_family_then_sequence() {
        let mut keys = vec![
            ArchiveKey::new("kpe_25.1.1.2", 1),
            ArchiveKey::new("kpe_25.1.1.1", 10),
            ArchiveKey::new("kpe_25.1.1.1", 2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ArchiveKey::new("kpe_25.1.1.1", 2),
                ArchiveKey::new("kpe_25.1.1.1", 10),
                ArchiveKey::new("kpe_25.1.1.2", 1),
            ]
        );
    }

    #[test]
    fn test_parsed_archive_canonical_path() {
        let parsed = ParsedArchive::from_path("/dl/kpe_25.1.1.1_garbage3.zip").unwrap();
        assert_eq!(parsed.format, ArchiveFormat::Zip);
        assert!(!parsed.is_canonical());
        assert_eq!(
            parsed.canonical_path(),
            PathBuf::from("/dl/kpe_25.1.1.1_3.zip")
        );
    }

    #[test]
    fn test_parsed_archive_rejects_other_files() {
        assert!(ParsedArchive::from_path("/dl/kpe_25.1.1.1_3.txt").is_none());
        assert!(ParsedArchive::from_path("/dl/notes.zip").is_none());
    }

    #[test]
    fn test_canonical_detection_ignores_case() {
        let parsed = ParsedArchive::from_path("/dl/kpe_25.1.1.1_3.ZIP").unwrap();
        assert!(parsed.is_canonical());
    }

    proptest! {
        #[test]
        fn prop_last_digit_run_wins(
            text in "[a-z]{1,8}",
            version in (0u32..100, 0u32..100, 0u32..100, 0u32..100),
            noise in "[a-z#№ ]{0,6}",
            first in 0u32..1000,
            last in 0u32..100_000,
        ) {
            let name = format!(
                "{}_{}.{}.{}.{}_{}{}x{}.zip",
                text, version.0, version.1, version.2, version.3, noise, first, last
            );
            let key = parse_archive_key(&name).unwrap();
            prop_assert_eq!(
                key.family,
                format!("{}_{}.{}.{}.{}", text, version.0, version.1, version.2, version.3)
            );
            prop_assert_eq!(key.sequence, last);
        }

        #[test]
        fn prop_no_digits_in_suffix_fails(
            text in "[a-z]{1,8}",
            noise in "[a-z_#]{0,10}",
        ) {
            let name = format!("{}_1.2.3.4{}.rar", text, noise);
            prop_assert!(parse_archive_key(&name).is_err());
        }
    }
}
