//! INI-backed configuration file.

use std::path::{Path, PathBuf};

use ini::Ini;

use super::ConfigError;

const APP_DIR: &str = "fixsync";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Default support site host, also the base for relative fix package paths.
pub const DEFAULT_SUPPORT_URL: &str = "https://support.tax.nalog.ru";
/// Default knowledge base search endpoint.
pub const DEFAULT_SEARCH_URL: &str =
    "https://support.tax.nalog.ru/sections/knowledge_base/search.php";
/// Default knowledge base page carrying the current product version.
pub const DEFAULT_VERSION_PAGE: &str = "https://support.tax.nalog.ru/sections/knowledge_base/";
/// Default check interval in minutes.
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 10;
/// Default network timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Directory holding the config file.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Full path to the config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Default log directory (`<data_dir>/fixsync/logs`).
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathsSettings {
    /// Where fix packages are downloaded.
    pub download_dir: Option<PathBuf>,
    /// Where installers are written; unset means `download_dir`.
    pub sfx_output_dir: Option<PathBuf>,
    pub oe_distro_dir: Option<PathBuf>,
    pub prom_distro_dir: Option<PathBuf>,
    /// Directory holding `7z.exe`, `7z.dll` and `7zS.sfx`.
    pub sfx_tools_dir: Option<PathBuf>,
}

/// `[sources]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcesSettings {
    pub support_url: String,
    pub search_url: String,
    pub version_page_url: String,
    pub search_kb: String,
    pub fix_prefix: String,
    pub oe_ftp_url: String,
    pub prom_ftp_url: String,
    pub distro_subdir: String,
    /// Skips version resolution when set.
    pub target_version: Option<String>,
}

impl Default for SourcesSettings {
    fn default() -> Self {
        Self {
            support_url: DEFAULT_SUPPORT_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            version_page_url: DEFAULT_VERSION_PAGE.to_string(),
            search_kb: "fns".to_string(),
            fix_prefix: "kpe_".to_string(),
            oe_ftp_url: String::new(),
            prom_ftp_url: String::new(),
            distro_subdir: "EKP".to_string(),
            target_version: None,
        }
    }
}

/// `[automation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationSettings {
    pub auto_download: bool,
    pub auto_sfx: bool,
    pub auto_check: bool,
    pub check_interval_minutes: u64,
    pub auto_download_oe: bool,
    pub auto_download_prom: bool,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            auto_download: false,
            auto_sfx: true,
            auto_check: false,
            check_interval_minutes: DEFAULT_CHECK_INTERVAL_MINUTES,
            auto_download_oe: false,
            auto_download_prom: false,
        }
    }
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("fixsync/{}", crate::VERSION),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// The persisted configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub paths: PathsSettings,
    pub sources: SourcesSettings,
    pub automation: AutomationSettings,
    pub network: NetworkSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Save to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in super::ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in super::ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert!(config.automation.auto_sfx);
        assert!(!config.automation.auto_download);
        assert_eq!(config.automation.check_interval_minutes, 10);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.paths.download_dir = Some(PathBuf::from("/data/fixes"));
        config.automation.auto_download = true;
        config.sources.target_version = Some("25.1.1.1".to_string());
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = ConfigFile::parse(
            "[automation]\nauto_download = yes\ncheck_interval_minutes = 30\n",
        )
        .unwrap();
        assert!(config.automation.auto_download);
        assert_eq!(config.automation.check_interval_minutes, 30);
        assert_eq!(config.sources.search_kb, "fns");
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let result = ConfigFile::parse("[automation]\nauto_sfx = maybe\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
