//! Setup phase: derive the group layout and the knockout ladder from the team count.

use crate::models::{ConfigError, StageName};
use serde::{Deserialize, Serialize};

/// Fewest teams a tournament can run with.
pub const MIN_TEAMS: u32 = 2;

/// Groups smaller than this play every pairing twice.
const DOUBLE_ROUND_BELOW: u32 = 3;

/// One group to be created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupPlan {
    pub name: String,
    pub size: u32,
    pub rounds: u32,
}

/// Structural layout of a tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentPlan {
    pub groups: Vec<GroupPlan>,
    /// Knockout stages in playing order.
    pub ko_ladder: Vec<StageName>,
}

impl TournamentPlan {
    /// `(stage_index, name)` of every stage: the group stage at 1, then the
    /// ladder from 2.
    pub fn stages(&self) -> impl Iterator<Item = (u32, StageName)> + '_ {
        std::iter::once((1, StageName::Group)).chain(
            self.ko_ladder
                .iter()
                .enumerate()
                .map(|(i, name)| (i as u32 + 2, *name)),
        )
    }
}

/// Plan groups and knockout stages for `team_count` teams.
///
/// `group_size` is the largest group wanted; `None` picks one with
/// [`auto_group_size`]. Teams are spread evenly, so groups differ by at most
/// one team.
pub fn plan(
    team_count: u32,
    group_size: Option<u32>,
    teams_in_ko: u32,
) -> Result<TournamentPlan, ConfigError> {
    if team_count < MIN_TEAMS {
        return Err(ConfigError::TooFewTeams {
            min: MIN_TEAMS,
            got: team_count,
        });
    }
    let ko_ladder = ko_ladder(teams_in_ko)?;
    if teams_in_ko > team_count {
        return Err(ConfigError::KnockoutExceedsTeams {
            teams_in_ko,
            team_count,
        });
    }

    let size = group_size.unwrap_or_else(|| auto_group_size(team_count));
    if size < 2 || size > team_count {
        return Err(ConfigError::InvalidGroupSize { size, team_count });
    }

    let count = team_count.div_ceil(size);
    let base = team_count / count;
    let extra = team_count % count;
    if base < 2 {
        // A group of one plays nobody.
        return Err(ConfigError::InvalidGroupSize { size, team_count });
    }

    let groups = (0..count)
        .map(|i| {
            let size = if i < extra { base + 1 } else { base };
            GroupPlan {
                name: group_name(i as usize),
                size,
                rounds: if size < DOUBLE_ROUND_BELOW { 2 } else { 1 },
            }
        })
        .collect();

    Ok(TournamentPlan { groups, ko_ladder })
}

/// Default group size: the candidate `g` in `3..=team_count` with the best
/// score `-(open slots) - 2 * (odd group count) - penalty(g)`, where the
/// penalty pulls towards groups of 4 or 5. Sizes that need as many groups as
/// `g - 1` does are skipped. Ties go to the smaller size.
pub fn auto_group_size(team_count: u32) -> u32 {
    let mut best: Option<(i64, u32)> = None;
    for g in 3..=team_count {
        let groups = team_count.div_ceil(g);
        if groups == team_count.div_ceil(g - 1) {
            continue;
        }
        let open_slots = i64::from(groups * g - team_count);
        let odd_groups = i64::from(groups % 2);
        let penalty = i64::from(4u32.saturating_sub(g) + g.saturating_sub(5));
        let score = -open_slots - 2 * odd_groups - penalty;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, g));
        }
    }
    best.map_or(team_count, |(_, g)| g)
}

/// Knockout stages for `teams_in_ko` qualifiers: halving rounds down to the
/// semifinals, then the third-place match (when there are semifinals) and the
/// final.
pub fn ko_ladder(teams_in_ko: u32) -> Result<Vec<StageName>, ConfigError> {
    if teams_in_ko < 2 || !teams_in_ko.is_power_of_two() {
        return Err(ConfigError::KnockoutNotPowerOfTwo(teams_in_ko));
    }
    let mut ladder = Vec::new();
    let mut teams = teams_in_ko;
    while teams > 2 {
        ladder.push(StageName::Round(teams / 2));
        teams /= 2;
    }
    if teams_in_ko >= 4 {
        ladder.push(StageName::ThirdPlace);
    }
    ladder.push(StageName::Final);
    Ok(ladder)
}

/// `A`, `B`, ..., `Z`, `AA`, `AB`, ...
fn group_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_teams_in_one_group() {
        let plan = plan(6, Some(6), 4).unwrap();
        assert_eq!(
            plan.groups,
            vec![GroupPlan {
                name: "A".into(),
                size: 6,
                rounds: 1
            }]
        );
    }

    #[test]
    fn two_team_group_plays_twice() {
        let plan = plan(2, Some(2), 2).unwrap();
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].rounds, 2);
        assert_eq!(plan.ko_ladder, vec![StageName::Final]);
    }

    #[test]
    fn eight_teams_two_groups_with_semifinals() {
        let plan = plan(8, Some(4), 4).unwrap();
        let names: Vec<_> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(plan.groups.iter().all(|g| g.size == 4 && g.rounds == 1));
        assert_eq!(
            plan.ko_ladder,
            vec![StageName::Round(2), StageName::ThirdPlace, StageName::Final]
        );
        let indices: Vec<_> = plan.stages().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn uneven_team_counts_spread_evenly() {
        let plan = plan(10, Some(4), 8).unwrap();
        let sizes: Vec<_> = plan.groups.iter().map(|g| g.size).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(plan.groups.iter().map(|g| g.size).sum::<u32>(), 10);
    }

    #[test]
    fn ladder_shape_holds_for_every_valid_configuration() {
        for team_count in 4..=40 {
            let mut teams_in_ko = 2;
            while teams_in_ko <= team_count {
                let plan = plan(team_count, None, teams_in_ko).unwrap();
                assert_eq!(plan.ko_ladder[0].slots(), teams_in_ko);
                let finals = plan
                    .ko_ladder
                    .iter()
                    .filter(|s| **s == StageName::Final)
                    .count();
                let third = plan
                    .ko_ladder
                    .iter()
                    .filter(|s| **s == StageName::ThirdPlace)
                    .count();
                assert_eq!(finals, 1);
                assert_eq!(third, usize::from(teams_in_ko >= 4));
                assert_eq!(plan.ko_ladder.last(), Some(&StageName::Final));
                teams_in_ko *= 2;
            }
        }
    }

    #[test]
    fn third_place_comes_right_before_the_final() {
        let ladder = ko_ladder(16).unwrap();
        assert_eq!(
            ladder,
            vec![
                StageName::Round(8),
                StageName::Round(4),
                StageName::Round(2),
                StageName::ThirdPlace,
                StageName::Final
            ]
        );
    }

    #[test]
    fn rejects_bad_knockout_sizes() {
        assert_eq!(plan(8, None, 6), Err(ConfigError::KnockoutNotPowerOfTwo(6)));
        assert_eq!(plan(8, None, 1), Err(ConfigError::KnockoutNotPowerOfTwo(1)));
        assert_eq!(
            plan(6, None, 8),
            Err(ConfigError::KnockoutExceedsTeams {
                teams_in_ko: 8,
                team_count: 6
            })
        );
    }

    #[test]
    fn rejects_groups_of_one() {
        assert!(matches!(
            plan(3, Some(2), 2),
            Err(ConfigError::InvalidGroupSize { .. })
        ));
        assert!(matches!(plan(1, None, 2), Err(ConfigError::TooFewTeams { .. })));
    }

    #[test]
    fn auto_size_prefers_four_or_five() {
        assert_eq!(auto_group_size(16), 4);
        assert_eq!(auto_group_size(20), 5);
        assert_eq!(auto_group_size(6), 3);
        assert_eq!(auto_group_size(2), 2);
    }

    #[test]
    fn group_names_continue_after_z() {
        assert_eq!(group_name(0), "A");
        assert_eq!(group_name(25), "Z");
        assert_eq!(group_name(26), "AA");
        assert_eq!(group_name(27), "AB");
    }
}
