//! Derives where a tournament stands purely from team and match counts.

use crate::logic::round_robin::round_robin_match_count;
use crate::models::{Match, MatchStatus, StageId, StageName};
use serde::Serialize;

/// Name reported for the set-up phase (stage index 0).
pub const SETUP_STAGE_NAME: &str = "SETUP";

/// Status of one stage, or of the set-up phase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Not reachable yet: no matches, or the previous stage is unfinished.
    #[default]
    Pending,
    /// All matches generated, none started.
    Initialized,
    InProgress,
    Complete,
}

/// Match counts of one stage by status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MatchCounts {
    pub scheduled: u32,
    pub in_progress: u32,
    pub complete: u32,
}

impl MatchCounts {
    pub fn tally<'a>(matches: impl IntoIterator<Item = &'a Match>) -> Self {
        let mut counts = Self::default();
        for m in matches {
            match m.status {
                MatchStatus::Scheduled => counts.scheduled += 1,
                MatchStatus::InProgress => counts.in_progress += 1,
                MatchStatus::Complete => counts.complete += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.scheduled + self.in_progress + self.complete
    }

    pub fn started(&self) -> bool {
        self.in_progress > 0 || self.complete > 0
    }
}

/// Raw resolver input for one stored stage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StageInput {
    pub stage_id: StageId,
    pub stage_index: u32,
    pub name: StageName,
    /// Matches the stage has once fully generated.
    pub expected: u32,
    pub counts: MatchCounts,
}

/// Everything the resolver looks at for one tournament.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StatusInputs {
    /// Declared `num_teams`.
    pub declared_teams: u32,
    /// Teams bound to the tournament.
    pub bound_teams: u32,
    /// Bound teams that sit in a group.
    pub placed_teams: u32,
    pub stages: Vec<StageInput>,
}

/// A reference to a stored stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct StageRef {
    pub stage_id: StageId,
    pub stage_index: u32,
    pub name: StageName,
}

impl From<&StageInput> for StageRef {
    fn from(input: &StageInput) -> Self {
        Self {
            stage_id: input.stage_id,
            stage_index: input.stage_index,
            name: input.name,
        }
    }
}

/// Per-stage line of the resolver output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StageProgress {
    pub stage: StageRef,
    pub status: StageStatus,
    pub expected: u32,
    pub counts: MatchCounts,
}

/// Where the tournament stands.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TournamentStatus {
    /// 0 while in set-up.
    pub current_stage_index: u32,
    pub current_stage_name: String,
    pub status: StageStatus,
    /// The stage after the current one; `None` once the last stage is reached.
    pub next_stage: Option<StageRef>,
    pub stages: Vec<StageProgress>,
}

impl TournamentStatus {
    pub fn is_finished(&self) -> bool {
        self.current_stage_index > 0
            && self.status == StageStatus::Complete
            && self.next_stage.is_none()
    }

    pub fn current_stage(&self) -> Option<&StageProgress> {
        self.stages
            .iter()
            .find(|p| p.stage.stage_index == self.current_stage_index)
    }
}

/// Matches a group stage needs: the sum over groups of
/// `rounds * C(members, 2)`.
pub fn expected_group_matches<I>(groups: I) -> u32
where
    I: IntoIterator<Item = (usize, u32)>,
{
    groups
        .into_iter()
        .map(|(members, rounds)| round_robin_match_count(members, rounds))
        .sum()
}

/// Status of one stage from its counts. `predecessor_complete` is whether the
/// stage before it (or the set-up phase) is done.
pub fn stage_status(input: &StageInput, predecessor_complete: bool) -> StageStatus {
    let expected = input.expected;
    let counts = &input.counts;
    if expected == 0 {
        StageStatus::Pending
    } else if counts.complete == expected {
        StageStatus::Complete
    } else if counts.total() == expected && counts.started() {
        StageStatus::InProgress
    } else if counts.scheduled == expected && predecessor_complete {
        StageStatus::Initialized
    } else {
        StageStatus::Pending
    }
}

/// Walk the set-up phase and then the stages in index order. Completed stages
/// advance the current stage; the first stage that is generated but not
/// complete becomes current and ends the walk, as does an unreachable one.
pub fn resolve(inputs: &StatusInputs) -> TournamentStatus {
    let mut stages: Vec<&StageInput> = inputs.stages.iter().collect();
    stages.sort_by_key(|s| s.stage_index);

    let mut progress: Vec<StageProgress> = stages
        .iter()
        .map(|s| StageProgress {
            stage: StageRef::from(*s),
            status: StageStatus::Pending,
            expected: s.expected,
            counts: s.counts,
        })
        .collect();

    let setup_status = if inputs.bound_teams < inputs.declared_teams {
        StageStatus::Initialized
    } else if inputs.placed_teams < inputs.bound_teams {
        StageStatus::InProgress
    } else {
        StageStatus::Complete
    };

    // Position in `stages` of the current stage; `None` is the set-up phase.
    let mut current: Option<usize> = None;
    let mut status = setup_status;

    if setup_status == StageStatus::Complete {
        for (i, stage) in stages.iter().enumerate() {
            let found = stage_status(stage, true);
            progress[i].status = found;
            match found {
                StageStatus::Complete => {
                    current = Some(i);
                    status = StageStatus::Complete;
                }
                StageStatus::Initialized | StageStatus::InProgress => {
                    current = Some(i);
                    status = found;
                    break;
                }
                StageStatus::Pending => break,
            }
        }
    }

    let next_position = current.map_or(0, |i| i + 1);
    let next_stage = stages.get(next_position).map(|s| StageRef::from(*s));
    let (current_stage_index, current_stage_name) = match current {
        Some(i) => (stages[i].stage_index, stages[i].name.to_string()),
        None => (0, SETUP_STAGE_NAME.to_string()),
    };

    TournamentStatus {
        current_stage_index,
        current_stage_name,
        status,
        next_stage,
        stages: progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn stage(index: u32, name: StageName, expected: u32, counts: (u32, u32, u32)) -> StageInput {
        StageInput {
            stage_id: Uuid::new_v4(),
            stage_index: index,
            name,
            expected,
            counts: MatchCounts {
                scheduled: counts.0,
                in_progress: counts.1,
                complete: counts.2,
            },
        }
    }

    /// 8 teams, two groups of 4, semifinals, third place, final.
    fn inputs(group: (u32, u32, u32), semis: (u32, u32, u32)) -> StatusInputs {
        StatusInputs {
            declared_teams: 8,
            bound_teams: 8,
            placed_teams: 8,
            stages: vec![
                stage(1, StageName::Group, 12, group),
                stage(2, StageName::Round(2), 2, semis),
                stage(3, StageName::ThirdPlace, 1, (0, 0, 0)),
                stage(4, StageName::Final, 1, (0, 0, 0)),
            ],
        }
    }

    #[test]
    fn recruiting_teams_is_initialized_setup() {
        let mut i = inputs((0, 0, 0), (0, 0, 0));
        i.bound_teams = 5;
        i.placed_teams = 0;
        let status = resolve(&i);
        assert_eq!(status.current_stage_index, 0);
        assert_eq!(status.current_stage_name, SETUP_STAGE_NAME);
        assert_eq!(status.status, StageStatus::Initialized);
        assert_eq!(status.next_stage.map(|s| s.stage_index), Some(1));
    }

    #[test]
    fn drawing_groups_is_setup_in_progress() {
        let mut i = inputs((0, 0, 0), (0, 0, 0));
        i.placed_teams = 6;
        let status = resolve(&i);
        assert_eq!(status.current_stage_index, 0);
        assert_eq!(status.status, StageStatus::InProgress);
    }

    #[test]
    fn drawn_groups_complete_setup() {
        let status = resolve(&inputs((0, 0, 0), (0, 0, 0)));
        assert_eq!(status.current_stage_index, 0);
        assert_eq!(status.status, StageStatus::Complete);
        assert_eq!(status.next_stage.map(|s| s.name), Some(StageName::Group));
        assert!(!status.is_finished());
    }

    #[test]
    fn generated_group_stage_is_initialized() {
        let status = resolve(&inputs((12, 0, 0), (0, 0, 0)));
        assert_eq!(status.current_stage_index, 1);
        assert_eq!(status.current_stage_name, "GROUP");
        assert_eq!(status.status, StageStatus::Initialized);
    }

    #[test]
    fn started_group_stage_is_in_progress() {
        let status = resolve(&inputs((9, 1, 2), (0, 0, 0)));
        assert_eq!(status.current_stage_index, 1);
        assert_eq!(status.status, StageStatus::InProgress);
        assert_eq!(status.next_stage.map(|s| s.stage_index), Some(2));
    }

    #[test]
    fn finished_group_stage_points_to_first_knockout_round() {
        let status = resolve(&inputs((0, 0, 12), (0, 0, 0)));
        assert_eq!(status.current_stage_index, 1);
        assert_eq!(status.status, StageStatus::Complete);
        assert_eq!(status.next_stage.map(|s| s.name), Some(StageName::Round(2)));
        assert_eq!(status.stages[1].status, StageStatus::Pending);
    }

    #[test]
    fn partially_generated_stage_is_not_reachable() {
        let status = resolve(&inputs((0, 0, 12), (1, 0, 0)));
        assert_eq!(status.current_stage_index, 1);
        assert_eq!(status.status, StageStatus::Complete);
    }

    #[test]
    fn last_stage_complete_finishes_the_tournament() {
        let mut i = inputs((0, 0, 12), (0, 0, 2));
        i.stages[2].counts.complete = 1;
        i.stages[3].counts.complete = 1;
        let status = resolve(&i);
        assert_eq!(status.current_stage_index, 4);
        assert_eq!(status.current_stage_name, "KO_FINAL_1");
        assert!(status.next_stage.is_none());
        assert!(status.is_finished());
    }

    #[test]
    fn completed_stage_never_regresses() {
        let mut i = inputs((0, 0, 12), (0, 0, 0));
        let before = resolve(&i);
        assert_eq!(before.stages[0].status, StageStatus::Complete);

        for step in [(2, 0, 0), (1, 1, 0), (0, 1, 1), (0, 0, 2)] {
            i.stages[1].counts = MatchCounts {
                scheduled: step.0,
                in_progress: step.1,
                complete: step.2,
            };
            let status = resolve(&i);
            assert_eq!(status.stages[0].status, StageStatus::Complete);
            assert_eq!(status.current_stage_index, 2);
        }
    }

    #[test]
    fn group_expectation_sums_groups() {
        assert_eq!(expected_group_matches([(4, 1), (4, 1)]), 12);
        assert_eq!(expected_group_matches([(2, 2), (3, 1)]), 5);
        assert_eq!(expected_group_matches(Vec::new()), 0);
    }
}
