//! Logger configuration file.
//!
//! A single JSON document holding station metadata, entry defaults, import
//! tuning, and runtime knobs. Missing keys take their defaults so older files
//! keep loading.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    adif::ImportOptions,
    error::StorageError,
    qso::{DEFAULT_RST, QsoDraft},
    runtime::RuntimeConfig,
    types::Frequency,
};

/// Session-independent station metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationInfo {
    /// Station callsign.
    pub callsign: String,
    /// Operator name.
    pub name: Option<String>,
    /// Maidenhead grid square.
    pub grid: Option<String>,
    /// City or location.
    pub qth: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// CQ zone.
    pub cq_zone: Option<u8>,
    /// ITU zone.
    pub itu_zone: Option<u8>,
}

/// Everything the logger reads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Station metadata.
    pub station: StationInfo,
    /// Mode pre-filled in new entries.
    pub default_mode: String,
    /// Report pre-filled in both directions.
    pub default_rst: String,
    /// Frequency pre-filled in new entries.
    pub default_frequency_mhz: f64,
    /// SQLite journal location; `None` keeps the log in memory.
    pub db_path: Option<PathBuf>,
    /// ADIF import tuning.
    pub import: ImportOptions,
    /// Journaling knobs.
    pub runtime: RuntimeConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            station: StationInfo::default(),
            default_mode: "SSB".to_string(),
            default_rst: DEFAULT_RST.to_string(),
            default_frequency_mhz: 14.250,
            db_path: None,
            import: ImportOptions::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Reads `path`, or returns defaults when it does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error rather
    /// than silently replaced.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config = serde_json::from_str(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Writes pretty-printed JSON to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Draft for `callsign` with the configured defaults filled in.
    pub fn draft(&self, callsign: impl Into<String>, timestamp: DateTime<Utc>) -> QsoDraft {
        let frequency = Frequency::from_mhz(self.default_frequency_mhz)
            .map(|f| f.as_str().to_string())
            .unwrap_or_default();
        let mut draft = QsoDraft::new(callsign, frequency, self.default_mode.clone(), timestamp);
        draft.rst_sent = Some(self.default_rst.clone());
        draft.rst_rcvd = Some(self.default_rst.clone());
        draft
    }
}
