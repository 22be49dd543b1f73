//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tally_core::{Markers, WeekStart};

/// Application configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// First day of the week for week ranges and month breakdowns.
    #[serde(default)]
    pub week_start: WeekStart,

    /// Marker glyphs recognised in task descriptions.
    #[serde(default)]
    pub markers: Markers,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("week_start", &self.week_start.weekday())
            .field("recurring", &self.markers.recurring)
            .field("spontaneous", &self.markers.spontaneous)
            .field("scheduled", &self.markers.scheduled)
            .finish()
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // TALLY_WEEK_START, TALLY_MARKERS__RECURRING, ...
        figment = figment.merge(Env::prefixed("TALLY_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for tally.
///
/// On Linux: `~/.config/tally`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tally"))
}
