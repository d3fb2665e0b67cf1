//! Per-QSO point rules.
//!
//! Contest scoring is keyed by exchange format; each format resolves to a
//! [`RuleTable`] that a configuration may replace wholesale.

use serde::{Deserialize, Serialize};

use crate::{
    qso::QsoRecord,
    types::{Band, ModeClass},
};

/// Points credited for one non-dupe contact.
pub trait ScoringRule {
    /// Points for `qso`.
    fn points(&self, qso: &QsoRecord) -> u32;
}

/// One row of a rule table; `None` matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOverride {
    /// Band filter.
    pub band: Option<Band>,
    /// Mode-class filter.
    pub class: Option<ModeClass>,
    /// Points when matched.
    pub points: u32,
}

/// Points by mode class, with band/mode overrides checked first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Phone contact.
    pub phone: u32,
    /// CW contact.
    pub cw: u32,
    /// Digital contact.
    pub digital: u32,
    /// First match wins.
    #[serde(default)]
    pub overrides: Vec<RuleOverride>,
}

impl RuleTable {
    /// Same points for every class.
    pub const fn flat(points: u32) -> Self {
        Self {
            phone: points,
            cw: points,
            digital: points,
            overrides: Vec::new(),
        }
    }

    /// Field Day table: CW and digital worth twice phone.
    pub const fn field_day() -> Self {
        Self {
            phone: 1,
            cw: 2,
            digital: 2,
            overrides: Vec::new(),
        }
    }
}

impl ScoringRule for RuleTable {
    fn points(&self, qso: &QsoRecord) -> u32 {
        let band = qso.band();
        let class = qso.mode.class();
        if let Some(hit) = self.overrides.iter().find(|o| {
            o.band.is_none_or(|b| b == band) && o.class.is_none_or(|c| c == class)
        }) {
            return hit.points;
        }
        match class {
            ModeClass::Phone => self.phone,
            ModeClass::Cw => self.cw,
            ModeClass::Digital => self.digital,
        }
    }
}

/// Exchange formats with a built-in rule table.
pub const KNOWN_EXCHANGE_FORMATS: &[&str] = &["RST+SN", "RST+ZONE", "RST+STATE", "RST+NAME"];

/// Built-in table for an exchange format (case-insensitive).
pub fn rule_for_exchange_format(format: &str) -> Option<RuleTable> {
    match format.trim().to_ascii_uppercase().as_str() {
        "RST+SN" | "RST+ZONE" | "RST+NAME" => Some(RuleTable::flat(1)),
        "RST+STATE" => Some(RuleTable {
            phone: 1,
            cw: 2,
            digital: 2,
            overrides: Vec::new(),
        }),
        _ => None,
    }
}

/// True when the format carries a serial number.
pub fn exchange_uses_serial(format: &str) -> bool {
    format
        .to_ascii_uppercase()
        .split('+')
        .any(|part| part.trim() == "SN")
}
