use serde::{Deserialize, Serialize};
use std::fmt;

/// Reputation tier, ordered from lowest to highest.
///
/// Declaration order is the ranking used for progress and transition checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Apprentice,
    Journeyman,
    Expert,
    Master,
    Grandmaster,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Apprentice,
        Tier::Journeyman,
        Tier::Expert,
        Tier::Master,
        Tier::Grandmaster,
    ];

    /// Minimum composite score for the tier.
    pub fn threshold(self) -> u32 {
        match self {
            Tier::Apprentice => 0,
            Tier::Journeyman => 200,
            Tier::Expert => 400,
            Tier::Master => 600,
            Tier::Grandmaster => 800,
        }
    }

    /// Position in [`Tier::ALL`].
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Tier> {
        Tier::ALL.get(self.ordinal() + 1).copied()
    }

    /// Highest tier whose threshold the score reaches.
    ///
    /// Only the resolution hook uses this; the stored tier is what every
    /// read path reports.
    pub fn for_score(score: u32) -> Tier {
        Tier::ALL
            .iter()
            .rev()
            .copied()
            .find(|t| score >= t.threshold())
            .unwrap_or(Tier::Apprentice)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Apprentice => "APPRENTICE",
            Tier::Journeyman => "JOURNEYMAN",
            Tier::Expert => "EXPERT",
            Tier::Master => "MASTER",
            Tier::Grandmaster => "GRANDMASTER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "APPRENTICE" => Some(Tier::Apprentice),
            "JOURNEYMAN" => Some(Tier::Journeyman),
            "EXPERT" => Some(Tier::Expert),
            "MASTER" => Some(Tier::Master),
            "GRANDMASTER" => Some(Tier::Grandmaster),
            _ => None,
        }
    }
}

impl TryFrom<String> for Tier {
    type Error = UnknownTier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tier::from_str(&value).ok_or(UnknownTier(value))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
