// Settings module
// User defaults persisted between runs (RON in the config dir)

use crate::color::BackgroundColor;
use crate::error::{Error, Result};
use crate::geometry::{LogoRatio, DEFAULT_LOGO_RATIO};
use crate::preview::DEFAULT_PREVIEW_DELAY;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for the settings directory
pub const CONFIG_DIR_ENV: &str = "LOGOWALL_CONFIG_DIR";

const SETTINGS_FILE: &str = "settings.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub color: BackgroundColor,
    pub ratio: f64,
    pub preview_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: BackgroundColor::default(),
            ratio: DEFAULT_LOGO_RATIO,
            preview_delay_ms: DEFAULT_PREVIEW_DELAY.as_millis() as u64,
        }
    }
}

impl Settings {
    /// `$LOGOWALL_CONFIG_DIR/settings.ron`, else the platform config dir
    pub fn default_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(dir).join(SETTINGS_FILE));
        }
        dirs::config_dir().map(|d| d.join("logowall").join(SETTINGS_FILE))
    }

    /// Read settings; a missing file yields defaults, a broken one is reported
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::io(format!("read {}", path.display()), e)),
        };

        let settings: Self = ron::from_str(&text)
            .map_err(|e| Error::Settings(format!("{}: {e}", path.display())))?;
        if LogoRatio::new(settings.ratio).is_err() {
            warn!("Ignoring out-of-range ratio {} in {}", settings.ratio, path.display());
            return Ok(Self {
                ratio: DEFAULT_LOGO_RATIO,
                ..settings
            });
        }
        Ok(settings)
    }

    /// Load from the default location, falling back to defaults on any error
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            warn!("{e}; using default settings");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Settings(e.to_string()))?;
        fs::write(path, text).map_err(|e| Error::io(format!("write {}", path.display()), e))
    }

    pub fn logo_ratio(&self) -> LogoRatio {
        LogoRatio::new(self.ratio).unwrap_or_default()
    }

    pub fn preview_delay(&self) -> Duration {
        Duration::from_millis(self.preview_delay_ms)
    }
}
