//! Qualitative labels for compatibility scores.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative tier of a compatibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchLabel {
    /// 91 and above.
    Destined,
    /// 81–90.
    PerfectMatch,
    /// 71–80.
    Resonant,
    /// Below 71.
    Acquainted,
}

impl MatchLabel {
    /// Stable kebab-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Destined => "destined",
            Self::PerfectMatch => "perfect-match",
            Self::Resonant => "resonant",
            Self::Acquainted => "acquainted",
        }
    }
}

impl MatchLabel {
    /// Human-readable tier name.
    pub fn title(self) -> &'static str {
        match self {
            Self::Destined => "Destined",
            Self::PerfectMatch => "Perfect Match",
            Self::Resonant => "Kindred Spirits",
            Self::Acquainted => "Fated Acquaintance",
        }
    }
}

impl fmt::Display for MatchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a score to its label. Each tier includes its lower bound.
#[inline]
pub fn label_for(score: u8) -> MatchLabel {
    match score {
        91.. => MatchLabel::Destined,
        81.. => MatchLabel::PerfectMatch,
        71.. => MatchLabel::Resonant,
        _ => MatchLabel::Acquainted,
    }
}
