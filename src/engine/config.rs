//! Mode-start configuration and its validation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{dupe::DupeScope, error::InvalidConfigError};

use super::{
    ModeKind,
    scoring::{RuleTable, rule_for_exchange_format},
};

/// Highest accepted contest starting serial; leaves room to count upward
/// without wrapping.
pub const MAX_SERIAL_START: u32 = 999_999_999;

/// Configuration passed to `start_mode`, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModeConfig {
    /// Plain logging.
    General,
    /// Activating one or more parks.
    PotaActivation(PotaActivationConfig),
    /// Hunting activators.
    PotaHunter(PotaHunterConfig),
    /// Serial or exchange contest.
    Contest(ContestConfig),
    /// ARRL Field Day.
    FieldDay(FieldDayConfig),
}

impl ModeConfig {
    /// Discriminator of this config.
    pub fn kind(&self) -> ModeKind {
        match self {
            ModeConfig::General => ModeKind::General,
            ModeConfig::PotaActivation(_) => ModeKind::PotaActivation,
            ModeConfig::PotaHunter(_) => ModeKind::PotaHunter,
            ModeConfig::Contest(_) => ModeKind::Contest,
            ModeConfig::FieldDay(_) => ModeKind::FieldDay,
        }
    }
}

/// POTA activation settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PotaActivationConfig {
    /// Parks being activated; at least one.
    pub parks: Vec<String>,
    /// Callsign used on the air, if not the station default.
    pub station_callsign: Option<String>,
}

impl PotaActivationConfig {
    /// Activation of a single park.
    pub fn single(park: impl Into<String>) -> Self {
        Self {
            parks: vec![park.into()],
            station_callsign: None,
        }
    }

    pub(crate) fn normalized(mut self) -> Result<Self, InvalidConfigError> {
        self.parks = normalize_parks(&self.parks);
        if self.parks.is_empty() {
            return Err(InvalidConfigError::new(
                ModeKind::PotaActivation,
                "at least one park reference is required",
            ));
        }
        if let Some(bad) = self.parks.iter().find(|p| !is_park_reference(p)) {
            return Err(InvalidConfigError::new(
                ModeKind::PotaActivation,
                format!("`{bad}` is not a park reference"),
            ));
        }
        Ok(self)
    }
}

/// POTA hunting settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PotaHunterConfig {
    /// Callsign used on the air, if not the station default.
    pub station_callsign: Option<String>,
}

/// Contest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestConfig {
    /// Contest name, used in Cabrillo output.
    pub name: String,
    /// Exchange format key, e.g. `RST+SN`.
    pub exchange_format: String,
    /// First serial number to send; required.
    pub serial_start: Option<u32>,
    /// Fixed part of the exchange (zone, state, name) for non-serial formats.
    pub my_exchange: Option<String>,
    /// Start of the dupe window; defaults to the moment the session starts.
    pub start_time: Option<DateTime<Utc>>,
    /// Dupe scope.
    #[serde(default)]
    pub dupe_scope: DupeScope,
    /// Replaces the built-in table for `exchange_format`.
    pub rule_table: Option<RuleTable>,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            exchange_format: "RST+SN".to_string(),
            serial_start: None,
            my_exchange: None,
            start_time: None,
            dupe_scope: DupeScope::WholeLog,
            rule_table: None,
        }
    }
}

impl ContestConfig {
    pub(crate) fn resolve(mut self) -> Result<(Self, RuleTable, u32), InvalidConfigError> {
        self.exchange_format = self.exchange_format.trim().to_ascii_uppercase();
        if self.exchange_format.is_empty() {
            return Err(InvalidConfigError::new(
                ModeKind::Contest,
                "exchange format is required",
            ));
        }
        let serial = self.serial_start.ok_or_else(|| {
            InvalidConfigError::new(ModeKind::Contest, "starting serial number is required")
        })?;
        if serial > MAX_SERIAL_START {
            return Err(InvalidConfigError::new(
                ModeKind::Contest,
                format!("starting serial {serial} is above {MAX_SERIAL_START}"),
            ));
        }
        let table = match self.rule_table.clone() {
            Some(table) => table,
            None => rule_for_exchange_format(&self.exchange_format).ok_or_else(|| {
                InvalidConfigError::new(
                    ModeKind::Contest,
                    format!(
                        "no scoring rule for exchange format `{}`; supply a rule table",
                        self.exchange_format
                    ),
                )
            })?,
        };
        Ok((self, table, serial))
    }
}

/// Field Day settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDayConfig {
    /// Transmitter count plus category letter, e.g. `3A`.
    pub my_class: String,
    /// ARRL/RAC section, e.g. `NCA`.
    pub my_section: String,
    /// Claimed bonus points by name.
    #[serde(default)]
    pub bonuses: BTreeMap<String, u32>,
    /// Per-QSO point table.
    #[serde(default = "RuleTable::field_day")]
    pub points: RuleTable,
    /// Start of the dupe window; defaults to the moment the session starts.
    pub start_time: Option<DateTime<Utc>>,
    /// Dupe scope.
    #[serde(default)]
    pub dupe_scope: DupeScope,
}

impl Default for FieldDayConfig {
    fn default() -> Self {
        Self {
            my_class: String::new(),
            my_section: String::new(),
            bonuses: BTreeMap::new(),
            points: RuleTable::field_day(),
            start_time: None,
            dupe_scope: DupeScope::WholeLog,
        }
    }
}

impl FieldDayConfig {
    /// Config with class and section, default points, no bonuses.
    pub fn new(my_class: impl Into<String>, my_section: impl Into<String>) -> Self {
        Self {
            my_class: my_class.into(),
            my_section: my_section.into(),
            ..Self::default()
        }
    }

    /// Exchange token sent on the air, e.g. `3A NCA`.
    pub fn exchange(&self) -> String {
        format!("{} {}", self.my_class, self.my_section)
    }

    pub(crate) fn normalized(mut self) -> Result<Self, InvalidConfigError> {
        self.my_class = self.my_class.trim().to_ascii_uppercase();
        self.my_section = self.my_section.trim().to_ascii_uppercase();
        if !is_field_day_class(&self.my_class) {
            return Err(InvalidConfigError::new(
                ModeKind::FieldDay,
                format!("`{}` is not a Field Day class like 3A", self.my_class),
            ));
        }
        let section_ok = (2..=4).contains(&self.my_section.len())
            && self.my_section.chars().all(|c| c.is_ascii_alphabetic());
        if !section_ok {
            return Err(InvalidConfigError::new(
                ModeKind::FieldDay,
                format!("`{}` is not a section abbreviation", self.my_section),
            ));
        }
        Ok(self)
    }
}

/// Uppercases, trims, drops blanks and repeats.
pub fn normalize_parks(parks: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for park in parks.iter().flat_map(|p| p.split(',')) {
        let park = park.trim().to_ascii_uppercase();
        if !park.is_empty() && !out.contains(&park) {
            out.push(park);
        }
    }
    out
}

/// `PREFIX-NNNN` park reference, e.g. `K-1234` or `US-4571`.
pub fn is_park_reference(text: &str) -> bool {
    let Some((prefix, number)) = text.split_once('-') else {
        return false;
    };
    (1..=4).contains(&prefix.len())
        && prefix.chars().all(|c| c.is_ascii_alphanumeric())
        && (4..=5).contains(&number.len())
        && number.chars().all(|c| c.is_ascii_digit())
}

fn is_field_day_class(class: &str) -> bool {
    let Some(category) = class.chars().last() else {
        return false;
    };
    let count = &class[..class.len() - category.len_utf8()];
    ('A'..='F').contains(&category)
        && (1..=2).contains(&count.len())
        && count.chars().all(|c| c.is_ascii_digit())
}
