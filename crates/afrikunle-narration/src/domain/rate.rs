//! Speech rate presets.

use std::fmt;
use std::str::FromStr;

/// The rate picker's presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatePreset {
    /// 0.8
    Slow,
    /// 0.95
    #[default]
    Normal,
    /// 1.2
    Fast,
}

impl RatePreset {
    /// Playback rate for the preset.
    #[must_use]
    pub fn value(self) -> f32 {
        match self {
            Self::Slow => 0.8,
            Self::Normal => 0.95,
            Self::Fast => 1.2,
        }
    }
}

impl fmt::Display for RatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slow => f.write_str("slow"),
            Self::Normal => f.write_str("normal"),
            Self::Fast => f.write_str("fast"),
        }
    }
}

impl FromStr for RatePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            other => Err(format!("unknown speech rate preset: {other}")),
        }
    }
}

/// Parses a preset name or a positive number.
#[must_use]
pub fn parse_rate(raw: &str) -> Option<f32> {
    raw.parse::<RatePreset>().map(RatePreset::value).ok().or_else(|| {
        raw.trim()
            .parse::<f32>()
            .ok()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    })
}
