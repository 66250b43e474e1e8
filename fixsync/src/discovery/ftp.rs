//! Distribution mirror discovery over FTP.

use std::time::Duration;

use tracing::debug;
use url::Url;

use super::{DiscoveryError, DistroArtifact, DistroDiscovery, DistroKind};
use crate::archive::{compare_versions, find_version, ArchiveFormat};
use crate::events::Reporter;
use crate::transfer::{ftp_path, open_ftp};

/// Directory listing capability.
///
/// Entries are bare names; implementations strip any path prefix the server
/// returns and drop `.` and `..`.
pub trait FtpLister: Send + Sync {
    fn list(&self, dir: &Url) -> Result<Vec<String>, DiscoveryError>;
}

/// [`FtpLister`] backed by a fresh `suppaftp` connection per listing.
#[derive(Debug, Clone)]
pub struct SuppaFtpLister {
    timeout: Duration,
}

impl SuppaFtpLister {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl FtpLister for SuppaFtpLister {
    fn list(&self, dir: &Url) -> Result<Vec<String>, DiscoveryError> {
        let ftp_error = |e: suppaftp::FtpError| DiscoveryError::Ftp {
            url: dir.to_string(),
            reason: e.to_string(),
        };
        let mut stream = open_ftp(dir, self.timeout).map_err(ftp_error)?;
        let path = ftp_path(dir);
        let entries = stream.nlst(Some(&path)).map_err(ftp_error)?;
        let _ = stream.quit();
        Ok(normalize_listing(entries))
    }
}

/// Reduce raw listing lines to bare entry names.
fn normalize_listing(lines: impl IntoIterator<Item = String>) -> Vec<String> {
    lines
        .into_iter()
        .filter_map(|line| {
            let entry = line.trim();
            entry
                .rsplit(['/', '\\'])
                .find(|part| !part.is_empty())
                .map(str::to_string)
        })
        .filter(|name| name != "." && name != "..")
        .collect()
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Newest distribution image under an FTP root.
///
/// The root lists version folders (`25.9.30.1`, `AIS_25_9_30_1`, ...); the
/// image is the archive inside `<newest>/<subdir>/`.
pub struct FtpDiscovery<L = SuppaFtpLister> {
    lister: L,
    root: String,
    subdir: String,
    kind: DistroKind,
}

impl<L: FtpLister> FtpDiscovery<L> {
    pub fn new(
        lister: L,
        root: impl Into<String>,
        subdir: impl Into<String>,
        kind: DistroKind,
    ) -> Self {
        Self {
            lister,
            root: root.into(),
            subdir: subdir.into(),
            kind,
        }
    }

    /// Subdirectory spellings tried in order.
    fn subdir_candidates(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(3);
        for name in [
            self.subdir.clone(),
            self.subdir.to_uppercase(),
            self.subdir.to_lowercase(),
        ] {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Discover, surfacing failures.
    pub fn try_discover(
        &self,
        reporter: &Reporter,
    ) -> Result<Option<DistroArtifact>, DiscoveryError> {
        let root = Url::parse(&self.root)
            .map(ensure_trailing_slash)
            .map_err(|e| DiscoveryError::InvalidUrl {
                url: self.root.clone(),
                reason: e.to_string(),
            })?;

        reporter.info(format!("Checking {} distribution at {}", self.kind, root));
        let entries = self.lister.list(&root)?;

        let mut candidates: Vec<(String, String)> = entries
            .into_iter()
            .filter_map(|entry| find_version(&entry).map(|version| (entry, version)))
            .collect();
        candidates.sort_by(|a, b| compare_versions(&b.1, &a.1));

        let Some((folder, version)) = candidates.into_iter().next() else {
            reporter.warn(format!("No version folders found at {}", root));
            return Ok(None);
        };
        debug!(folder = %folder, version = %version, "newest version folder");

        for subdir in self.subdir_candidates() {
            let dir = root
                .join(&format!("{}/{}/", folder, subdir))
                .map_err(|e| DiscoveryError::InvalidUrl {
                    url: format!("{}{}/{}/", root, folder, subdir),
                    reason: e.to_string(),
                })?;

            // Servers answer a missing directory with 550.
            let files = match self.lister.list(&dir) {
                Ok(files) => files,
                Err(e) => {
                    debug!(dir = %dir, error = %e, "subdirectory listing failed");
                    continue;
                }
            };
            if files.is_empty() {
                debug!(dir = %dir, "subdirectory empty or missing");
                continue;
            }

            let mut archives: Vec<&String> = files
                .iter()
                .filter(|f| ArchiveFormat::from_path(f.as_str()).is_some())
                .collect();
            // RAR is the published image format; ZIP only as a fallback.
            archives.sort_by_key(|f| ArchiveFormat::from_path(f.as_str()) != Some(ArchiveFormat::Rar));

            let Some(file) = archives.first() else {
                reporter.warn(format!("No archive found in {}", dir));
                return Ok(None);
            };
            if archives.len() > 1 {
                reporter.warn(format!(
                    "{} archives in {}, using {}",
                    archives.len(),
                    dir,
                    file
                ));
            }

            let full_url = dir.join(file).map_err(|e| DiscoveryError::InvalidUrl {
                url: format!("{}{}", dir, file),
                reason: e.to_string(),
            })?;
            reporter.info(format!("Latest {} distribution: {} ({})", self.kind, version, file));
            return Ok(Some(DistroArtifact::new(
                self.kind,
                version,
                file.as_str(),
                full_url.to_string(),
            )));
        }

        reporter.warn(format!(
            "Distribution folder {}/{} is empty at {}",
            folder, self.subdir, root
        ));
        Ok(None)
    }
}

impl<L: FtpLister> DistroDiscovery for FtpDiscovery<L> {
    fn kind(&self) -> DistroKind {
        self.kind
    }

    fn discover(&self, reporter: &Reporter) -> Option<DistroArtifact> {
        self.try_discover(reporter).unwrap_or_else(|e| {
            reporter.error(format!("{} distribution check failed: {}", self.kind, e));
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Lister serving a fixed tree keyed by URL path.
    struct TreeLister {
        tree: HashMap<String, Vec<&'static str>>,
        fail: bool,
        missing_is_error: bool,
    }

    impl TreeLister {
        fn new(entries: &[(&str, &[&'static str])]) -> Self {
            Self {
                tree: entries
                    .iter()
                    .map(|(path, names)| (path.to_string(), names.to_vec()))
                    .collect(),
                fail: false,
                missing_is_error: false,
            }
        }
    }

    impl FtpLister for TreeLister {
        fn list(&self, dir: &Url) -> Result<Vec<String>, DiscoveryError> {
            if self.fail {
                return Err(DiscoveryError::Ftp {
                    url: dir.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            match self.tree.get(dir.path()) {
                Some(names) => Ok(names.iter().map(|s| s.to_string()).collect()),
                None if self.missing_is_error => Err(DiscoveryError::Ftp {
                    url: dir.to_string(),
                    reason: "550 No such file or directory".to_string(),
                }),
                None => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn test_normalize_listing() {
        let lines = vec![
            "/OE/25.9.30.1".to_string(),
            ".".to_string(),
            "..".to_string(),
            " 25_10_1_0 ".to_string(),
            "dir\\sub\\file.rar".to_string(),
        ];
        assert_eq!(
            normalize_listing(lines),
            vec!["25.9.30.1", "25_10_1_0", "file.rar"]
        );
    }

    #[test]
    fn test_picks_newest_folder_and_archive() {
        let lister = TreeLister::new(&[
            ("/OE/", &["readme.txt", "25.9.30.1", "AIS_25_10_1_0", "25.9.99.99"]),
            ("/OE/AIS_25_10_1_0/EKP/", &["notes.txt", "setup_25.10.1.0.rar"]),
        ]);
        let discovery = FtpDiscovery::new(lister, "ftp://mirror.example/OE", "EKP", DistroKind::Oe);

        let found = discovery.discover(&Reporter::silent()).unwrap();
        assert_eq!(found.version, "25.10.1.0");
        assert_eq!(found.file_name, "setup_25.10.1.0.rar");
        assert_eq!(
            found.full_url,
            "ftp://mirror.example/OE/AIS_25_10_1_0/EKP/setup_25.10.1.0.rar"
        );
        assert_eq!(found.kind, DistroKind::Oe);
    }

    #[test]
    fn test_alternate_subdir_casing() {
        let lister = TreeLister::new(&[
            ("/PROM/", &["25.1.1.1"]),
            ("/PROM/25.1.1.1/ekp/", &["prom.rar"]),
        ]);
        let discovery =
            FtpDiscovery::new(lister, "ftp://mirror.example/PROM/", "Ekp", DistroKind::Prom);
        let found = discovery.discover(&Reporter::silent()).unwrap();
        assert_eq!(found.file_name, "prom.rar");
    }

    #[test]
    fn test_missing_subdir_error_falls_through_to_other_casing() {
        let mut lister = TreeLister::new(&[
            ("/PROM/", &["25.1.1.1"]),
            ("/PROM/25.1.1.1/ekp/", &["prom.rar"]),
        ]);
        lister.missing_is_error = true;
        let discovery =
            FtpDiscovery::new(lister, "ftp://mirror.example/PROM/", "EKP", DistroKind::Prom);
        let found = discovery
            .try_discover(&Reporter::silent())
            .unwrap()
            .expect("lower-case subdirectory should be found");
        assert_eq!(found.file_name, "prom.rar");
        assert_eq!(found.version, "25.1.1.1");
    }

    #[test]
    fn test_every_subdir_missing_is_none() {
        let mut lister = TreeLister::new(&[("/OE/", &["25.1.1.1"])]);
        lister.missing_is_error = true;
        let discovery = FtpDiscovery::new(lister, "ftp://mirror.example/OE/", "EKP", DistroKind::Oe);
        assert!(discovery.try_discover(&Reporter::silent()).unwrap().is_none());
    }

    #[test]
    fn test_no_version_folder_is_none() {
        let lister = TreeLister::new(&[("/OE/", &["latest", "old"])]);
        let discovery = FtpDiscovery::new(lister, "ftp://mirror.example/OE/", "EKP", DistroKind::Oe);
        assert!(discovery.discover(&Reporter::silent()).is_none());
    }

    #[test]
    fn test_listing_failure_is_absorbed() {
        let mut lister = TreeLister::new(&[]);
        lister.fail = true;
        let discovery = FtpDiscovery::new(lister, "ftp://mirror.example/OE/", "EKP", DistroKind::Oe);
        assert!(discovery.discover(&Reporter::silent()).is_none());
        assert!(discovery.try_discover(&Reporter::silent()).is_err());
    }

    #[test]
    fn test_subdir_candidates_are_unique() {
        let discovery = FtpDiscovery::new(TreeLister::new(&[]), "ftp://h/", "EKP", DistroKind::Oe);
        assert_eq!(discovery.subdir_candidates(), vec!["EKP", "ekp"]);
    }
}
