//! Configuration file
//!
//! Configuration is read from TOML. Every section and key is optional:
//!
//! ```toml
//! [target]
//! chip = "esp32c3"
//! baud = 921600
//! before = "default-reset"
//! after = "hard-reset"
//!
//! [tool]
//! program = "esptool.py"
//! args = []
//!
//! [catalog]
//! directory = "bin"
//! extension = "bin"
//! classify_ota_data = true
//!
//! [watcher]
//! interval_ms = 1000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::target::ChipTarget;

/// External flashing tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCommand {
    /// Program to execute (looked up in `PATH` if not a path)
    pub program: PathBuf,
    /// Arguments placed before the generated ones (e.g. `["-m", "esptool"]`)
    pub args: Vec<String>,
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("esptool.py"),
            args: Vec::new(),
        }
    }
}

/// `[catalog]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Directory scanned for images (created if missing)
    pub directory: PathBuf,
    /// Image file extension
    pub extension: String,
    /// Classify `boot_app0` images as OTA data
    ///
    /// When off, scanned `boot_app0` files are listed as applications and
    /// the OTA data role stays empty. Flashing still needs all four roles,
    /// so the OTA data image must then be given explicitly (`--ota-data`).
    pub classify_ota_data: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("bin"),
            extension: "bin".to_string(),
            classify_ota_data: true,
        }
    }
}

/// `[watcher]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Poll interval in milliseconds
    pub interval_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl WatcherSettings {
    /// Poll interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chip and esptool settings
    pub target: ChipTarget,
    /// Tool invocation
    pub tool: ToolCommand,
    /// Image catalog
    pub catalog: CatalogSettings,
    /// Port watcher
    pub watcher: WatcherSettings,
}

impl Config {
    /// Config file looked up in the working directory
    pub const FILE_NAME: &'static str = "fwflasher.toml";

    /// Parse and validate TOML
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a file
    pub fn to_toml_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Load the effective configuration
    ///
    /// An explicit path must exist. Without one, `./fwflasher.toml` is used
    /// when present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Error::ConfigNotFound(path.to_path_buf()));
            }
            log::debug!("Loading config from {}", path.display());
            return Self::from_toml_file(path);
        }

        let default = Path::new(Self::FILE_NAME);
        if default.is_file() {
            log::debug!("Loading config from {}", default.display());
            Self::from_toml_file(default)
        } else {
            log::debug!("No {} found, using defaults", Self::FILE_NAME);
            Ok(Self::default())
        }
    }

    /// Reject values that would only fail later
    pub fn validate(&self) -> Result<()> {
        self.target.chip_info()?;
        if self.target.baud == 0 {
            return Err(Error::InvalidConfig("baud must be non-zero".to_string()));
        }
        if self.watcher.interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "watcher.interval_ms must be non-zero".to_string(),
            ));
        }
        if self.catalog.extension.trim_start_matches('.').is_empty() {
            return Err(Error::InvalidConfig(
                "catalog.extension must not be empty".to_string(),
            ));
        }
        if self.tool.program.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("tool.program must not be empty".to_string()));
        }
        Ok(())
    }
}
