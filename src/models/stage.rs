//! Stages (group phase and knockout rounds) and groups.

use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a stage.
pub type StageId = Uuid;

/// Unique identifier for a group.
pub type GroupId = Uuid;

/// Name of a stage. The textual form is what gets displayed and stored:
/// `GROUP`, `KO<n>` (a round of `n` matches), `KO_FINAL_3`, `KO_FINAL_1`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StageName {
    Group,
    /// Knockout round with this many matches (pairings).
    Round(u32),
    /// Third-place match between the semifinal losers.
    ThirdPlace,
    /// The final between the semifinal winners.
    Final,
}

impl StageName {
    pub fn is_group(self) -> bool {
        self == StageName::Group
    }

    pub fn is_knockout(self) -> bool {
        !self.is_group()
    }

    /// Number of pairings in a knockout round (0 for the group stage).
    pub fn pairings(self) -> u32 {
        match self {
            StageName::Group => 0,
            StageName::Round(n) => n,
            StageName::ThirdPlace | StageName::Final => 1,
        }
    }

    /// Number of teams entering a knockout round.
    pub fn slots(self) -> u32 {
        self.pairings() * 2
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageName::Group => write!(f, "GROUP"),
            StageName::Round(n) => write!(f, "KO{}", n),
            StageName::ThirdPlace => write!(f, "KO_FINAL_3"),
            StageName::Final => write!(f, "KO_FINAL_1"),
        }
    }
}

/// The string is not a known stage name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownStageName(pub String);

impl fmt::Display for UnknownStageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stage name {:?}", self.0)
    }
}

impl std::error::Error for UnknownStageName {}

impl FromStr for StageName {
    type Err = UnknownStageName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GROUP" => Ok(StageName::Group),
            "KO_FINAL_3" => Ok(StageName::ThirdPlace),
            "KO_FINAL_1" => Ok(StageName::Final),
            _ => s
                .strip_prefix("KO")
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n >= 2)
                .map(StageName::Round)
                .ok_or_else(|| UnknownStageName(s.to_string())),
        }
    }
}

impl TryFrom<String> for StageName {
    type Error = UnknownStageName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StageName> for String {
    fn from(name: StageName) -> Self {
        name.to_string()
    }
}

/// One phase of a tournament. `stage_index` is 1-based; index 1 is always the
/// group stage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub tournament_id: TournamentId,
    pub stage_index: u32,
    pub name: StageName,
    /// Matches per pairing in a knockout round. Always 1 for the group stage.
    pub best_of: u32,
}

impl Stage {
    /// Matches this knockout stage needs once generated. The group stage is
    /// summed group by group instead, see [`crate::logic::expected_group_matches`].
    pub fn expected_knockout_matches(&self) -> u32 {
        self.name.pairings() * self.best_of
    }
}

/// A round-robin pool inside the group stage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub stage_id: StageId,
    pub name: String,
    /// Team capacity.
    pub size: u32,
    /// How often each pair meets.
    pub rounds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_parse_back() {
        for name in [
            StageName::Group,
            StageName::Round(8),
            StageName::Round(2),
            StageName::ThirdPlace,
            StageName::Final,
        ] {
            assert_eq!(name.to_string().parse::<StageName>(), Ok(name));
        }
    }

    #[test]
    fn unknown_stage_names_are_rejected() {
        assert!("KO".parse::<StageName>().is_err());
        assert!("KO1".parse::<StageName>().is_err());
        assert!("FINAL".parse::<StageName>().is_err());
    }

    #[test]
    fn slots_follow_pairings() {
        assert_eq!(StageName::Round(4).slots(), 8);
        assert_eq!(StageName::Final.slots(), 2);
        assert_eq!(StageName::Group.slots(), 0);
    }
}
