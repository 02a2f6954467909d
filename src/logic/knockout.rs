//! Knockout rounds: qualification out of the groups, pairing, and deciding
//! each pairing once its matches are played.

use crate::logic::standings::{compute_table, GroupStandings};
use crate::models::{ConfigError, Match, TeamId, TournamentError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Teams advancing from the group stage.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Qualification {
    /// Direct qualifiers by finishing position: `pots[0]` holds every group
    /// winner in group order, `pots[1]` every runner-up, and so on.
    pub pots: Vec<Vec<TeamId>>,
    /// Best of the rest, in ranking order.
    pub fill_ins: Vec<TeamId>,
}

impl Qualification {
    /// All qualifiers: the pots in order, then the fill-ins.
    pub fn teams(&self) -> Vec<TeamId> {
        self.pots
            .iter()
            .flatten()
            .chain(self.fill_ins.iter())
            .copied()
            .collect()
    }
}

/// Pick `slots_needed` teams from the group tables.
///
/// Every group sends its top `slots_needed / groups` teams. Leftover slots go
/// to the best remaining teams across all groups, ranked on their complete
/// group-stage record from `stage_matches`. A tie that cannot be broken at
/// either cut is an error, as is asking for more teams than there are.
pub fn qualify(
    groups: &[GroupStandings],
    stage_matches: &[Match],
    slots_needed: usize,
) -> Result<Qualification, TournamentError> {
    let available: usize = groups.iter().map(|g| g.standings.rows.len()).sum();
    if groups.is_empty() || slots_needed > available {
        return Err(ConfigError::NotEnoughTeams {
            needed: slots_needed,
            available,
        }
        .into());
    }

    let direct = slots_needed / groups.len();
    let mut pots = vec![Vec::with_capacity(groups.len()); direct];
    let mut pool = Vec::new();
    for group in groups {
        let rows = &group.standings.rows;
        if rows.len() < direct {
            return Err(ConfigError::NotEnoughTeams {
                needed: direct,
                available: rows.len(),
            }
            .into());
        }
        if let Some(tied) = group.standings.tie_across(direct) {
            return Err(TournamentError::TieUnresolved {
                teams: tied.to_vec(),
            });
        }
        for (rank, row) in rows.iter().enumerate() {
            if rank < direct {
                pots[rank].push(row.team_id);
            } else {
                pool.push(row.team_id);
            }
        }
    }

    let remaining = slots_needed - direct * groups.len();
    let mut fill_ins = Vec::with_capacity(remaining);
    if remaining > 0 {
        let table = compute_table(stage_matches, &pool);
        if let Some(tied) = table.tie_across(remaining) {
            return Err(TournamentError::TieUnresolved {
                teams: tied.to_vec(),
            });
        }
        fill_ins.extend(table.rows.iter().take(remaining).map(|r| r.team_id));
    }

    Ok(Qualification { pots, fill_ins })
}

/// Shuffle and pair consecutively. An odd team out is left unpaired.
pub fn pair_randomly<R: Rng + ?Sized>(teams: &[TeamId], rng: &mut R) -> Vec<(TeamId, TeamId)> {
    let mut teams = teams.to_vec();
    teams.shuffle(rng);
    pair_in_order(&teams)
}

/// `(teams[0], teams[1])`, `(teams[2], teams[3])`, ...
pub fn pair_in_order(teams: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    teams.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

/// `best_of` fixtures per pairing, home side alternating.
pub fn fixtures(pairs: &[(TeamId, TeamId)], best_of: u32) -> Vec<(TeamId, TeamId)> {
    pairs
        .iter()
        .flat_map(|&(a, b)| (0..best_of).map(move |leg| if leg % 2 == 0 { (a, b) } else { (b, a) }))
        .collect()
}

/// Result of one knockout pairing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct TieOutcome {
    pub winner: TeamId,
    pub loser: TeamId,
}

/// Decide every pairing of a finished knockout stage, in the order the
/// pairings first appear in `matches`. More won matches decide, then more
/// aggregate score.
pub fn decide_ties(matches: &[Match]) -> Result<Vec<TieOutcome>, TournamentError> {
    // (a, b, wins a, wins b, score a, score b)
    let mut ties: Vec<(TeamId, TeamId, u32, u32, u64, u64)> = Vec::new();
    for m in matches {
        let pos = ties.iter().position(|t| {
            (t.0 == m.team1 && t.1 == m.team2) || (t.0 == m.team2 && t.1 == m.team1)
        });
        let i = match pos {
            Some(i) => i,
            None => {
                ties.push((m.team1, m.team2, 0, 0, 0, 0));
                ties.len() - 1
            }
        };
        let tie = &mut ties[i];
        if let Some((s1, s2)) = m.scores().filter(|_| m.is_complete()) {
            let (for_a, for_b) = if tie.0 == m.team1 { (s1, s2) } else { (s2, s1) };
            tie.4 += u64::from(for_a);
            tie.5 += u64::from(for_b);
        }
        match m.winner().map(|side| m.team(side)) {
            Some(w) if w == tie.0 => tie.2 += 1,
            Some(_) => tie.3 += 1,
            None => {}
        }
    }

    ties.into_iter()
        .map(|(a, b, wins_a, wins_b, score_a, score_b)| {
            let a_through = match wins_a.cmp(&wins_b) {
                std::cmp::Ordering::Equal => match score_a.cmp(&score_b) {
                    std::cmp::Ordering::Equal => {
                        return Err(TournamentError::TieUnresolved { teams: vec![a, b] })
                    }
                    order => order.is_gt(),
                },
                order => order.is_gt(),
            };
            Ok(if a_through {
                TieOutcome { winner: a, loser: b }
            } else {
                TieOutcome { winner: b, loser: a }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Group, MatchStatus, NewMatch};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn played(t1: TeamId, t2: TeamId, s1: u32, s2: u32) -> Match {
        NewMatch {
            team1: t1,
            team2: t2,
            stage_id: Uuid::nil(),
            status: MatchStatus::Complete,
            scores: Some((s1, s2)),
        }
        .into_match(Uuid::new_v4())
    }

    /// A group of `n` where the team listed first beats everybody after it,
    /// winning by the gap in list position.
    fn group(name: &str, n: usize, all: &mut Vec<Match>) -> GroupStandings {
        let teams: Vec<TeamId> = (0..n).map(|_| Uuid::new_v4()).collect();
        let mut matches = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                matches.push(played(teams[i], teams[j], (j - i) as u32, 0));
            }
        }
        let standings = compute_table(&matches, &teams);
        all.extend(matches);
        GroupStandings {
            group: Group {
                id: Uuid::new_v4(),
                stage_id: Uuid::nil(),
                name: name.to_string(),
                size: n as u32,
                rounds: 1,
            },
            standings,
        }
    }

    #[test]
    fn two_groups_of_four_send_their_top_two() {
        let mut matches = Vec::new();
        let groups = vec![group("A", 4, &mut matches), group("B", 4, &mut matches)];
        let q = qualify(&groups, &matches, 4).unwrap();
        assert_eq!(q.pots.len(), 2);
        assert!(q.fill_ins.is_empty());
        let a = groups[0].standings.team_ids();
        let b = groups[1].standings.team_ids();
        assert_eq!(q.pots[0], vec![a[0], b[0]]);
        assert_eq!(q.pots[1], vec![a[1], b[1]]);
        assert_eq!(q.teams().len(), 4);
    }

    #[test]
    fn leftover_slots_go_to_best_of_the_rest() {
        // Three groups of 3 for 4 slots: three winners plus the best runner-up.
        let mut matches = Vec::new();
        let groups = vec![
            group("A", 3, &mut matches),
            group("B", 3, &mut matches),
            group("C", 3, &mut matches),
        ];
        // Make B's runner-up stronger than the other runners-up.
        let b = groups[1].standings.team_ids();
        let extra_opponent = Uuid::new_v4();
        matches.push(played(b[1], extra_opponent, 5, 0));

        let q = qualify(&groups, &matches, 4).unwrap();
        assert_eq!(q.pots.len(), 1);
        assert_eq!(q.pots[0].len(), 3);
        assert_eq!(q.fill_ins, vec![b[1]]);
    }

    #[test]
    fn level_runners_up_from_different_groups_cannot_be_split() {
        let mut matches = Vec::new();
        let groups = vec![
            group("A", 3, &mut matches),
            group("B", 3, &mut matches),
            group("C", 3, &mut matches),
        ];
        let err = qualify(&groups, &matches, 4).unwrap_err();
        assert!(matches!(err, TournamentError::TieUnresolved { ref teams } if teams.len() == 3));
    }

    #[test]
    fn goalless_group_cannot_pick_a_winner() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let matches = vec![played(a, b, 0, 0), played(b, a, 0, 0)];
        let groups = vec![GroupStandings {
            group: Group {
                id: Uuid::new_v4(),
                stage_id: Uuid::nil(),
                name: "A".to_string(),
                size: 2,
                rounds: 2,
            },
            standings: compute_table(&matches, &[a, b]),
        }];
        let err = qualify(&groups, &matches, 1).unwrap_err();
        assert!(matches!(err, TournamentError::TieUnresolved { ref teams } if teams.len() == 2));
    }

    #[test]
    fn asking_for_too_many_teams_fails_loudly() {
        let mut matches = Vec::new();
        let groups = vec![group("A", 3, &mut matches)];
        assert_eq!(
            qualify(&groups, &matches, 4),
            Err(TournamentError::Configuration(ConfigError::NotEnoughTeams {
                needed: 4,
                available: 3
            }))
        );
    }

    #[test]
    fn random_pairing_uses_every_team_once() {
        let teams: Vec<TeamId> = (0..8).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = pair_randomly(&teams, &mut rng);
        assert_eq!(pairs.len(), 4);
        let used: HashSet<TeamId> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        assert_eq!(used.len(), 8);
    }

    #[test]
    fn fixtures_alternate_home() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(fixtures(&[(a, b)], 3), vec![(a, b), (b, a), (a, b)]);
        assert_eq!(fixtures(&[(a, b)], 1), vec![(a, b)]);
    }

    #[test]
    fn ties_go_to_the_side_with_more_wins() {
        let t: Vec<TeamId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let matches = [
            played(t[0], t[1], 1, 0),
            played(t[2], t[3], 0, 4),
            played(t[1], t[0], 3, 0),
            played(t[3], t[2], 0, 1),
            played(t[0], t[1], 2, 1),
            played(t[2], t[3], 0, 2),
        ];
        let outcomes = decide_ties(&matches).unwrap();
        assert_eq!(
            outcomes,
            vec![
                TieOutcome {
                    winner: t[0],
                    loser: t[1]
                },
                TieOutcome {
                    winner: t[3],
                    loser: t[2]
                },
            ]
        );
    }

    #[test]
    fn level_pairing_is_unresolved() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let matches = [played(a, b, 1, 0), played(b, a, 1, 0)];
        assert!(matches!(
            decide_ties(&matches),
            Err(TournamentError::TieUnresolved { .. })
        ));
    }
}
