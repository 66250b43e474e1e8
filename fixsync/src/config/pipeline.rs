//! Resolved configuration handed to pipeline components.

use std::path::PathBuf;
use std::time::Duration;

use super::{ConfigError, ConfigFile};
use crate::discovery::DistroKind;

/// Check interval for a minute count; at least one minute, saturating on
/// overflow.
pub fn check_interval_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

/// Where one distribution image comes from and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistroSource {
    pub kind: DistroKind,
    /// FTP root listing version folders.
    pub ftp_url: String,
    /// Local directory for the downloaded image.
    pub target_dir: PathBuf,
    /// Download automatically when a pass finds a new image.
    pub auto_download: bool,
}

/// Fully resolved pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub download_dir: PathBuf,
    pub sfx_output_dir: PathBuf,
    pub sfx_tools_dir: Option<PathBuf>,
    pub support_url: String,
    pub search_url: String,
    pub version_page_url: String,
    pub search_kb: String,
    pub fix_prefix: String,
    pub distro_subdir: String,
    pub target_version: Option<String>,
    pub distros: Vec<DistroSource>,
    pub auto_download: bool,
    pub auto_sfx: bool,
    pub auto_check: bool,
    pub check_interval: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    /// Parent directory for staging and tools batches.
    pub staging_root: PathBuf,
}

impl PipelineConfig {
    /// Resolve a config file, validating required paths before any I/O.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, ConfigError> {
        let download_dir = config
            .paths
            .download_dir
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("paths.download_dir"))?;

        let sfx_output_dir = config
            .paths
            .sfx_output_dir
            .clone()
            .unwrap_or_else(|| download_dir.clone());

        let mut distros = Vec::new();
        for (kind, url, dir, auto) in [
            (
                DistroKind::Oe,
                &config.sources.oe_ftp_url,
                &config.paths.oe_distro_dir,
                config.automation.auto_download_oe,
            ),
            (
                DistroKind::Prom,
                &config.sources.prom_ftp_url,
                &config.paths.prom_distro_dir,
                config.automation.auto_download_prom,
            ),
        ] {
            if url.is_empty() {
                continue;
            }
            let target_dir = match dir {
                Some(d) => d.clone(),
                None if auto => return Err(ConfigError::Missing(kind.dir_key())),
                None => download_dir.clone(),
            };
            distros.push(DistroSource {
                kind,
                ftp_url: url.clone(),
                target_dir,
                auto_download: auto,
            });
        }

        let resolved = Self {
            download_dir,
            sfx_output_dir,
            sfx_tools_dir: config.paths.sfx_tools_dir.clone(),
            support_url: config.sources.support_url.clone(),
            search_url: config.sources.search_url.clone(),
            version_page_url: config.sources.version_page_url.clone(),
            search_kb: config.sources.search_kb.clone(),
            fix_prefix: config.sources.fix_prefix.clone(),
            distro_subdir: config.sources.distro_subdir.clone(),
            target_version: config.sources.target_version.clone(),
            distros,
            auto_download: config.automation.auto_download,
            auto_sfx: config.automation.auto_sfx,
            auto_check: config.automation.auto_check,
            check_interval: check_interval_from_minutes(
                config.automation.check_interval_minutes,
            ),
            timeout: Duration::from_secs(config.network.timeout_secs),
            user_agent: config.network.user_agent.clone(),
            staging_root: std::env::temp_dir(),
        };
        resolved.validate()?;
        Ok(resolved)
    }

    /// Check settings that cannot be defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("paths.download_dir"));
        }
        for (key, value) in [
            ("sources.support_url", &self.support_url),
            ("sources.search_url", &self.search_url),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }
        if self.auto_sfx && self.sfx_tools_dir.is_none() {
            return Err(ConfigError::Missing("paths.sfx_tools_dir"));
        }
        if let Some(version) = &self.target_version {
            if !crate::archive::is_valid_version(version) {
                return Err(ConfigError::InvalidValue {
                    key: "sources.target_version".to_string(),
                    value: version.clone(),
                    reason: "expected four dot-separated numbers".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Override the staging parent directory.
    pub fn with_staging_root(mut self, root: PathBuf) -> Self {
        self.staging_root = root;
        self
    }

    /// Settings for one distribution kind, if configured.
    pub fn distro(&self, kind: DistroKind) -> Option<&DistroSource> {
        self.distros.iter().find(|d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ConfigFile {
        let mut config = ConfigFile::default();
        config.paths.download_dir = Some(PathBuf::from("/data/fixes"));
        config.paths.sfx_tools_dir = Some(PathBuf::from("/opt/7z"));
        config
    }

    #[test]
    fn test_missing_download_dir_is_rejected() {
        let config = ConfigFile::default();
        let err = PipelineConfig::from_config_file(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("paths.download_dir")));
    }

    #[test]
    fn test_sfx_output_defaults_to_download_dir() {
        let resolved = PipelineConfig::from_config_file(&base_config()).unwrap();
        assert_eq!(resolved.sfx_output_dir, PathBuf::from("/data/fixes"));
        assert_eq!(resolved.check_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_check_interval_saturates() {
        assert_eq!(check_interval_from_minutes(0), Duration::from_secs(60));
        assert_eq!(check_interval_from_minutes(15), Duration::from_secs(900));
        assert_eq!(check_interval_from_minutes(u64::MAX), Duration::from_secs(u64::MAX));

        let mut config = base_config();
        config.automation.check_interval_minutes = u64::MAX;
        let resolved = PipelineConfig::from_config_file(&config).unwrap();
        assert_eq!(resolved.check_interval, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_auto_sfx_requires_tools_dir() {
        let mut config = base_config();
        config.paths.sfx_tools_dir = None;
        assert!(matches!(
            PipelineConfig::from_config_file(&config),
            Err(ConfigError::Missing("paths.sfx_tools_dir"))
        ));

        config.automation.auto_sfx = false;
        assert!(PipelineConfig::from_config_file(&config).is_ok());
    }

    #[test]
    fn test_distro_sources_are_resolved() {
        let mut config = base_config();
        config.sources.oe_ftp_url = "ftp://mirror.example/OE/".to_string();
        config.paths.oe_distro_dir = Some(PathBuf::from("/data/oe"));

        let resolved = PipelineConfig::from_config_file(&config).unwrap();
        let oe = resolved.distro(DistroKind::Oe).unwrap();
        assert_eq!(oe.target_dir, PathBuf::from("/data/oe"));
        assert!(resolved.distro(DistroKind::Prom).is_none());
    }

    #[test]
    fn test_auto_distro_download_requires_dir() {
        let mut config = base_config();
        config.sources.prom_ftp_url = "ftp://mirror.example/PROM/".to_string();
        config.automation.auto_download_prom = true;
        assert!(matches!(
            PipelineConfig::from_config_file(&config),
            Err(ConfigError::Missing("paths.prom_distro_dir"))
        ));
    }
}
