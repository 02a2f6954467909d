//! Match record and its status.

use crate::models::error::InvalidResult;
use crate::models::stage::StageId;
use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Lifecycle of a single match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    InProgress,
    Complete,
}

/// Which side of a match.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    One,
    Two,
}

/// A match between two teams inside one stage. `team1` plays at home.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team1: TeamId,
    pub team2: TeamId,
    /// `None` while scheduled.
    pub team1_score: Option<u32>,
    pub team2_score: Option<u32>,
    pub status: MatchStatus,
    pub stage_id: StageId,
}

impl Match {
    pub fn is_complete(&self) -> bool {
        self.status == MatchStatus::Complete
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.team1 == team || self.team2 == team
    }

    /// Both scores, when the match has any.
    pub fn scores(&self) -> Option<(u32, u32)> {
        self.team1_score.zip(self.team2_score)
    }

    /// Winning side of a completed match; `None` for a level score or a match
    /// that is not complete.
    pub fn winner(&self) -> Option<Side> {
        if !self.is_complete() {
            return None;
        }
        let (s1, s2) = self.scores()?;
        match s1.cmp(&s2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::One => self.team1,
            Side::Two => self.team2,
        }
    }

    /// Check the score/status invariants. `knockout` forbids level completed
    /// scores.
    pub fn validate(&self, knockout: bool) -> Result<(), InvalidResult> {
        if self.team1 == self.team2 {
            return Err(InvalidResult::SelfMatch);
        }
        validate_result((self.team1_score, self.team2_score), self.status, knockout)
    }
}

/// Score/status rules shared by new and reported matches.
pub fn validate_result(
    scores: (Option<u32>, Option<u32>),
    status: MatchStatus,
    knockout: bool,
) -> Result<(), InvalidResult> {
    match (status, scores) {
        (MatchStatus::Scheduled, (None, None)) => Ok(()),
        (MatchStatus::Scheduled, _) => Err(InvalidResult::ScoreOnScheduled),
        (_, (Some(s1), Some(s2))) => {
            if knockout && status == MatchStatus::Complete && s1 == s2 {
                Err(InvalidResult::KnockoutDraw)
            } else {
                Ok(())
            }
        }
        _ => Err(InvalidResult::MissingScore),
    }
}

/// A match to be inserted; the store assigns the id.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NewMatch {
    pub team1: TeamId,
    pub team2: TeamId,
    pub stage_id: StageId,
    pub status: MatchStatus,
    pub scores: Option<(u32, u32)>,
}

impl NewMatch {
    /// A fresh fixture without scores.
    pub fn scheduled(team1: TeamId, team2: TeamId, stage_id: StageId) -> Self {
        Self {
            team1,
            team2,
            stage_id,
            status: MatchStatus::Scheduled,
            scores: None,
        }
    }

    pub fn into_match(self, id: MatchId) -> Match {
        Match {
            id,
            team1: self.team1,
            team2: self.team2,
            team1_score: self.scores.map(|s| s.0),
            team2_score: self.scores.map(|s| s.1),
            status: self.status,
            stage_id: self.stage_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(scores: Option<(u32, u32)>, status: MatchStatus) -> Match {
        NewMatch {
            team1: Uuid::new_v4(),
            team2: Uuid::new_v4(),
            stage_id: Uuid::new_v4(),
            status,
            scores,
        }
        .into_match(Uuid::new_v4())
    }

    #[test]
    fn scheduled_match_has_no_scores() {
        assert_eq!(game(None, MatchStatus::Scheduled).validate(false), Ok(()));
        assert_eq!(
            game(Some((1, 0)), MatchStatus::Scheduled).validate(false),
            Err(InvalidResult::ScoreOnScheduled)
        );
    }

    #[test]
    fn started_match_needs_scores() {
        assert_eq!(
            game(None, MatchStatus::InProgress).validate(false),
            Err(InvalidResult::MissingScore)
        );
        assert_eq!(game(Some((0, 0)), MatchStatus::InProgress).validate(true), Ok(()));
    }

    #[test]
    fn level_score_only_allowed_in_groups() {
        let m = game(Some((2, 2)), MatchStatus::Complete);
        assert_eq!(m.validate(false), Ok(()));
        assert_eq!(m.validate(true), Err(InvalidResult::KnockoutDraw));
        assert_eq!(m.winner(), None);
    }

    #[test]
    fn winner_needs_completion() {
        assert_eq!(game(Some((3, 1)), MatchStatus::InProgress).winner(), None);
        assert_eq!(game(Some((3, 1)), MatchStatus::Complete).winner(), Some(Side::One));
        assert_eq!(game(Some((0, 1)), MatchStatus::Complete).winner(), Some(Side::Two));
    }
}
