//! Addressable configuration keys for `config get/set/list`.

use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};

/// Every setting in the config file, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    PathsDownloadDir,
    PathsSfxOutputDir,
    PathsOeDistroDir,
    PathsPromDistroDir,
    PathsSfxToolsDir,

    SourcesSupportUrl,
    SourcesSearchUrl,
    SourcesVersionPageUrl,
    SourcesSearchKb,
    SourcesFixPrefix,
    SourcesOeFtpUrl,
    SourcesPromFtpUrl,
    SourcesDistroSubdir,
    SourcesTargetVersion,

    AutomationAutoDownload,
    AutomationAutoSfx,
    AutomationAutoCheck,
    AutomationCheckIntervalMinutes,
    AutomationAutoDownloadOe,
    AutomationAutoDownloadProm,

    NetworkTimeoutSecs,
    NetworkUserAgent,

    LoggingLevel,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 24] = [
    ConfigKey::PathsDownloadDir,
    ConfigKey::PathsSfxOutputDir,
    ConfigKey::PathsOeDistroDir,
    ConfigKey::PathsPromDistroDir,
    ConfigKey::PathsSfxToolsDir,
    ConfigKey::SourcesSupportUrl,
    ConfigKey::SourcesSearchUrl,
    ConfigKey::SourcesVersionPageUrl,
    ConfigKey::SourcesSearchKb,
    ConfigKey::SourcesFixPrefix,
    ConfigKey::SourcesOeFtpUrl,
    ConfigKey::SourcesPromFtpUrl,
    ConfigKey::SourcesDistroSubdir,
    ConfigKey::SourcesTargetVersion,
    ConfigKey::AutomationAutoDownload,
    ConfigKey::AutomationAutoSfx,
    ConfigKey::AutomationAutoCheck,
    ConfigKey::AutomationCheckIntervalMinutes,
    ConfigKey::AutomationAutoDownloadOe,
    ConfigKey::AutomationAutoDownloadProm,
    ConfigKey::NetworkTimeoutSecs,
    ConfigKey::NetworkUserAgent,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// INI section.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            PathsDownloadDir | PathsSfxOutputDir | PathsOeDistroDir | PathsPromDistroDir
            | PathsSfxToolsDir => "paths",
            SourcesSupportUrl | SourcesSearchUrl | SourcesVersionPageUrl | SourcesSearchKb
            | SourcesFixPrefix | SourcesOeFtpUrl | SourcesPromFtpUrl | SourcesDistroSubdir
            | SourcesTargetVersion => "sources",
            AutomationAutoDownload
            | AutomationAutoSfx
            | AutomationAutoCheck
            | AutomationCheckIntervalMinutes
            | AutomationAutoDownloadOe
            | AutomationAutoDownloadProm => "automation",
            NetworkTimeoutSecs | NetworkUserAgent => "network",
            LoggingLevel | LoggingDirectory => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            PathsDownloadDir => "download_dir",
            PathsSfxOutputDir => "sfx_output_dir",
            PathsOeDistroDir => "oe_distro_dir",
            PathsPromDistroDir => "prom_distro_dir",
            PathsSfxToolsDir => "sfx_tools_dir",
            SourcesSupportUrl => "support_url",
            SourcesSearchUrl => "search_url",
            SourcesVersionPageUrl => "version_page_url",
            SourcesSearchKb => "search_kb",
            SourcesFixPrefix => "fix_prefix",
            SourcesOeFtpUrl => "oe_ftp_url",
            SourcesPromFtpUrl => "prom_ftp_url",
            SourcesDistroSubdir => "distro_subdir",
            SourcesTargetVersion => "target_version",
            AutomationAutoDownload => "auto_download",
            AutomationAutoSfx => "auto_sfx",
            AutomationAutoCheck => "auto_check",
            AutomationCheckIntervalMinutes => "check_interval_minutes",
            AutomationAutoDownloadOe => "auto_download_oe",
            AutomationAutoDownloadProm => "auto_download_prom",
            NetworkTimeoutSecs => "timeout_secs",
            NetworkUserAgent => "user_agent",
            LoggingLevel => "level",
            LoggingDirectory => "directory",
        }
    }

    /// Current value rendered as a string; unset values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let paths = &config.paths;
        let sources = &config.sources;
        let auto = &config.automation;
        match self {
            PathsDownloadDir => path_string(&paths.download_dir),
            PathsSfxOutputDir => path_string(&paths.sfx_output_dir),
            PathsOeDistroDir => path_string(&paths.oe_distro_dir),
            PathsPromDistroDir => path_string(&paths.prom_distro_dir),
            PathsSfxToolsDir => path_string(&paths.sfx_tools_dir),
            SourcesSupportUrl => sources.support_url.clone(),
            SourcesSearchUrl => sources.search_url.clone(),
            SourcesVersionPageUrl => sources.version_page_url.clone(),
            SourcesSearchKb => sources.search_kb.clone(),
            SourcesFixPrefix => sources.fix_prefix.clone(),
            SourcesOeFtpUrl => sources.oe_ftp_url.clone(),
            SourcesPromFtpUrl => sources.prom_ftp_url.clone(),
            SourcesDistroSubdir => sources.distro_subdir.clone(),
            SourcesTargetVersion => sources.target_version.clone().unwrap_or_default(),
            AutomationAutoDownload => auto.auto_download.to_string(),
            AutomationAutoSfx => auto.auto_sfx.to_string(),
            AutomationAutoCheck => auto.auto_check.to_string(),
            AutomationCheckIntervalMinutes => auto.check_interval_minutes.to_string(),
            AutomationAutoDownloadOe => auto.auto_download_oe.to_string(),
            AutomationAutoDownloadProm => auto.auto_download_prom.to_string(),
            NetworkTimeoutSecs => config.network.timeout_secs.to_string(),
            NetworkUserAgent => config.network.user_agent.clone(),
            LoggingLevel => config.logging.level.clone(),
            LoggingDirectory => path_string(&config.logging.directory),
        }
    }

    /// Parse `value` and store it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            PathsDownloadDir => config.paths.download_dir = optional_path(value),
            PathsSfxOutputDir => config.paths.sfx_output_dir = optional_path(value),
            PathsOeDistroDir => config.paths.oe_distro_dir = optional_path(value),
            PathsPromDistroDir => config.paths.prom_distro_dir = optional_path(value),
            PathsSfxToolsDir => config.paths.sfx_tools_dir = optional_path(value),
            SourcesSupportUrl => config.sources.support_url = self.url(value)?,
            SourcesSearchUrl => config.sources.search_url = self.url(value)?,
            SourcesVersionPageUrl => config.sources.version_page_url = self.url(value)?,
            SourcesSearchKb => config.sources.search_kb = value.to_string(),
            SourcesFixPrefix => config.sources.fix_prefix = value.to_string(),
            SourcesOeFtpUrl => config.sources.oe_ftp_url = self.url(value)?,
            SourcesPromFtpUrl => config.sources.prom_ftp_url = self.url(value)?,
            SourcesDistroSubdir => config.sources.distro_subdir = value.to_string(),
            SourcesTargetVersion => {
                if !value.is_empty() && !crate::archive::is_valid_version(value) {
                    return Err(self.invalid(value, "expected four dot-separated numbers"));
                }
                config.sources.target_version = (!value.is_empty()).then(|| value.to_string());
            }
            AutomationAutoDownload => config.automation.auto_download = self.flag(value)?,
            AutomationAutoSfx => config.automation.auto_sfx = self.flag(value)?,
            AutomationAutoCheck => config.automation.auto_check = self.flag(value)?,
            AutomationCheckIntervalMinutes => {
                let minutes = self.number(value)?;
                if minutes == 0 {
                    return Err(self.invalid(value, "interval must be at least one minute"));
                }
                config.automation.check_interval_minutes = minutes;
            }
            AutomationAutoDownloadOe => config.automation.auto_download_oe = self.flag(value)?,
            AutomationAutoDownloadProm => {
                config.automation.auto_download_prom = self.flag(value)?
            }
            NetworkTimeoutSecs => config.network.timeout_secs = self.number(value)?,
            NetworkUserAgent => config.network.user_agent = value.to_string(),
            LoggingLevel => config.logging.level = value.to_lowercase(),
            LoggingDirectory => config.logging.directory = optional_path(value),
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn flag(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn number(&self, value: &str) -> Result<u64, ConfigError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "expected a whole number"))
    }

    fn url(&self, value: &str) -> Result<String, ConfigError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        url::Url::parse(value)
            .map(|_| value.to_string())
            .map_err(|e| self.invalid(value, &e.to_string()))
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn path_string(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_are_unique() {
        let mut names: Vec<_> = ConfigKey::all().iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ConfigKey::all().len());
    }

    #[test]
    fn test_parse_key() {
        let key: ConfigKey = "paths.download_dir".parse().unwrap();
        assert_eq!(key, ConfigKey::PathsDownloadDir);
        assert!("paths.nope".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_get_and_set_round() {
        let mut config = ConfigFile::default();
        ConfigKey::PathsSfxOutputDir
            .set(&mut config, "/out")
            .unwrap();
        assert_eq!(ConfigKey::PathsSfxOutputDir.get(&config), "/out");

        ConfigKey::PathsSfxOutputDir.set(&mut config, "").unwrap();
        assert_eq!(config.paths.sfx_output_dir, None);
    }

    #[test]
    fn test_target_version_is_validated() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::SourcesTargetVersion
            .set(&mut config, "25.1")
            .is_err());
        ConfigKey::SourcesTargetVersion
            .set(&mut config, "25.1.1.1")
            .unwrap();
        assert_eq!(config.sources.target_version.as_deref(), Some("25.1.1.1"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ConfigFile::default();
        let err = ConfigKey::AutomationCheckIntervalMinutes
            .set(&mut config, "0")
            .unwrap_err();
        assert!(err.to_string().contains("automation.check_interval_minutes"));
    }

    #[test]
    fn test_url_keys_reject_garbage() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::SourcesOeFtpUrl
            .set(&mut config, "not a url")
            .is_err());
        ConfigKey::SourcesOeFtpUrl
            .set(&mut config, "ftp://mirror.example/OE/")
            .unwrap();
    }
}
