//! Shared primitive IDs, band plan, and emission-mode enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic QSO identifier.
pub type QsoId = u64;
/// Monotonic operation sequence number.
pub type OpSeq = u64;
/// Operating-session identifier.
pub type SessionId = u64;

/// Amateur band bucket derived from frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    /// 160 meters.
    B160m,
    /// 80 meters.
    B80m,
    /// 40 meters.
    B40m,
    /// 30 meters.
    B30m,
    /// 20 meters.
    B20m,
    /// 17 meters.
    B17m,
    /// 15 meters.
    B15m,
    /// 12 meters.
    B12m,
    /// 10 meters.
    B10m,
    /// 6 meters.
    B6m,
    /// 2 meters.
    B2m,
    /// Outside every band in the plan.
    Unknown,
}

/// Inclusive band edges in MHz.
const BAND_PLAN: [(Band, f64, f64); 11] = [
    (Band::B160m, 1.8, 2.0),
    (Band::B80m, 3.5, 4.0),
    (Band::B40m, 7.0, 7.3),
    (Band::B30m, 10.1, 10.15),
    (Band::B20m, 14.0, 14.35),
    (Band::B17m, 18.068, 18.168),
    (Band::B15m, 21.0, 21.45),
    (Band::B12m, 24.89, 24.99),
    (Band::B10m, 28.0, 29.7),
    (Band::B6m, 50.0, 54.0),
    (Band::B2m, 144.0, 148.0),
];

impl Band {
    /// Maps a frequency in MHz onto the band plan.
    pub fn from_mhz(mhz: f64) -> Self {
        BAND_PLAN
            .iter()
            .find(|(_, lo, hi)| (*lo..=*hi).contains(&mhz))
            .map(|(band, _, _)| *band)
            .unwrap_or(Band::Unknown)
    }

    /// Lower and upper edge in MHz, `None` for [`Band::Unknown`].
    pub fn edges(self) -> Option<(f64, f64)> {
        BAND_PLAN
            .iter()
            .find(|(band, _, _)| *band == self)
            .map(|(_, lo, hi)| (*lo, *hi))
    }

    /// ADIF band name (lowercase, e.g. `20m`).
    pub fn as_str(self) -> &'static str {
        match self {
            Band::B160m => "160m",
            Band::B80m => "80m",
            Band::B40m => "40m",
            Band::B30m => "30m",
            Band::B20m => "20m",
            Band::B17m => "17m",
            Band::B15m => "15m",
            Band::B12m => "12m",
            Band::B10m => "10m",
            Band::B6m => "6m",
            Band::B2m => "2m",
            Band::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emission mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Continuous Wave.
    CW,
    /// Single side-band phone.
    SSB,
    /// FT8 digital.
    FT8,
    /// FT4 digital.
    FT4,
    /// Radioteletype.
    RTTY,
    /// Frequency-modulated phone.
    FM,
    /// Any other digital mode logged generically.
    Digital,
    /// Mode outside the enumerated set, label kept uppercase.
    Other(String),
}

/// Scoring class of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeClass {
    /// Voice modes.
    Phone,
    /// Morse.
    Cw,
    /// Data and image modes.
    Digital,
}

const PHONE_LABELS: &[&str] = &[
    "AM", "USB", "LSB", "C4FM", "DMR", "DSTAR", "M17", "FREEDV", "DIGITALVOICE", "DIGVOICE",
];

impl Mode {
    /// Parses a mode label case-insensitively; `None` for blank input.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_uppercase();
        let mode = match label.as_str() {
            "" => return None,
            "CW" => Mode::CW,
            "SSB" => Mode::SSB,
            "FT8" => Mode::FT8,
            "FT4" => Mode::FT4,
            "RTTY" => Mode::RTTY,
            "FM" => Mode::FM,
            "DIGITAL" => Mode::Digital,
            _ => Mode::Other(label),
        };
        Some(mode)
    }

    /// Label written to ADIF `MODE`.
    pub fn as_str(&self) -> &str {
        match self {
            Mode::CW => "CW",
            Mode::SSB => "SSB",
            Mode::FT8 => "FT8",
            Mode::FT4 => "FT4",
            Mode::RTTY => "RTTY",
            Mode::FM => "FM",
            Mode::Digital => "DIGITAL",
            Mode::Other(label) => label,
        }
    }

    /// Phone/CW/digital bucket used by scoring tables.
    pub fn class(&self) -> ModeClass {
        match self {
            Mode::CW => ModeClass::Cw,
            Mode::SSB | Mode::FM => ModeClass::Phone,
            Mode::FT8 | Mode::FT4 | Mode::RTTY | Mode::Digital => ModeClass::Digital,
            Mode::Other(label) if PHONE_LABELS.contains(&label.as_str()) => ModeClass::Phone,
            Mode::Other(_) => ModeClass::Digital,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positive frequency in MHz that remembers the text it was entered as.
///
/// ADIF export writes the original text back so `FREQ` survives a
/// round-trip byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    mhz: f64,
    text: String,
}

impl Frequency {
    /// Parses decimal MHz text; rejects non-positive and non-finite values.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let mhz: f64 = text.parse().ok()?;
        (mhz.is_finite() && mhz > 0.0).then(|| Self {
            mhz,
            text: text.to_string(),
        })
    }

    /// Builds a frequency from a numeric MHz value.
    pub fn from_mhz(mhz: f64) -> Option<Self> {
        if !mhz.is_finite() || mhz <= 0.0 {
            return None;
        }
        let mut text = format!("{mhz:.6}");
        while text.ends_with('0') && !text.ends_with(".0") {
            text.pop();
        }
        Some(Self { mhz, text })
    }

    /// Value in MHz.
    pub fn mhz(&self) -> f64 {
        self.mhz
    }

    /// Value in kHz, rounded.
    pub fn khz(&self) -> u64 {
        (self.mhz * 1000.0).round() as u64
    }

    /// Text as entered.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Band this frequency falls in.
    pub fn band(&self) -> Band {
        Band::from_mhz(self.mhz)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for Frequency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Frequency::parse(&value).ok_or_else(|| format!("invalid frequency: {value}"))
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.text
    }
}
