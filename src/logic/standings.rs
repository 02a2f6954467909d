//! Group tables: win/loss tally, primary sort and direct-comparison tie-break.

use crate::models::{Group, Match, TeamId};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// One line of a table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StandingRow {
    pub team_id: TeamId,
    /// Wins plus losses. Level results count for neither.
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    /// Completed matches that ended level.
    pub draws: u32,
    pub score_for: u64,
    pub score_against: u64,
    pub diff: i64,
}

impl StandingRow {
    fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            ..Self::default()
        }
    }

    fn record(&mut self, scored: u32, conceded: u32) {
        match scored.cmp(&conceded) {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.draws += 1,
        }
        self.games = self.wins + self.losses;
        self.score_for += u64::from(scored);
        self.score_against += u64::from(conceded);
        self.diff = self.score_for as i64 - self.score_against as i64;
    }

    /// Whether any completed match counted for this team.
    fn has_played(&self) -> bool {
        self.games + self.draws > 0
    }

    /// Rows with equal keys are tied.
    fn tie_key(&self) -> (u32, i64, u64) {
        (self.wins, self.diff, self.score_for)
    }
}

/// Wins, then difference, then scored (all descending), then conceded
/// (ascending).
fn primary_order(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then(b.diff.cmp(&a.diff))
        .then(b.score_for.cmp(&a.score_for))
        .then(a.score_against.cmp(&b.score_against))
}

/// A ranked table plus the ties direct comparison could not separate.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Standings {
    pub rows: Vec<StandingRow>,
    /// Blocks of teams, in table order, that stay level after every
    /// tie-break level. Their relative order is the input order.
    pub unresolved: Vec<Vec<TeamId>>,
}

impl Standings {
    pub fn team_ids(&self) -> Vec<TeamId> {
        self.rows.iter().map(|r| r.team_id).collect()
    }

    /// The unresolved tie that straddles a cut after the first `cut` rows,
    /// if any.
    pub fn tie_across(&self, cut: usize) -> Option<&[TeamId]> {
        if cut == 0 || cut >= self.rows.len() {
            return None;
        }
        let above = self.rows[cut - 1].team_id;
        let below = self.rows[cut].team_id;
        self.unresolved
            .iter()
            .find(|block| block.contains(&above) && block.contains(&below))
            .map(Vec::as_slice)
    }
}

/// A group together with its table.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GroupStandings {
    pub group: Group,
    pub standings: Standings,
}

/// Rank `teams` by the completed `matches`.
///
/// Every match involving a listed team counts for it. Runs of teams level on
/// wins, difference and scored are re-ordered by a sub-table built only from
/// the matches among themselves, recursively, until a level no longer
/// separates anybody. Teams that have not completed a match yet are never
/// tie-broken.
pub fn compute_table(matches: &[Match], teams: &[TeamId]) -> Standings {
    rank(matches, teams, true)
}

/// Primary order only, no tie-break.
pub fn primary_table(matches: &[Match], teams: &[TeamId]) -> Vec<StandingRow> {
    let mut rows = tally(matches, teams, false);
    rows.sort_by(primary_order);
    rows
}

fn rank(matches: &[Match], teams: &[TeamId], top: bool) -> Standings {
    let mut rows = tally(matches, teams, !top);
    rows.sort_by(primary_order);

    let mut unresolved = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let key = rows[start].tie_key();
        let end = start
            + rows[start..]
                .iter()
                .take_while(|r| r.tie_key() == key)
                .count();
        let degenerate =
            top && key == (0, 0, 0) && !rows[start..end].iter().any(StandingRow::has_played);
        if end - start > 1 && !degenerate {
            let tied: Vec<TeamId> = rows[start..end].iter().map(|r| r.team_id).collect();
            if !top && tied.len() == rows.len() {
                // Direct comparison gives the same picture as this level.
                unresolved.push(tied);
            } else {
                let sub = rank(matches, &tied, false);
                let order: HashMap<TeamId, usize> = sub
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(i, r)| (r.team_id, i))
                    .collect();
                rows[start..end]
                    .sort_by_key(|r| order.get(&r.team_id).copied().unwrap_or(usize::MAX));
                unresolved.extend(sub.unresolved);
            }
        }
        start = end;
    }

    Standings { rows, unresolved }
}

/// Rows in `teams` order (duplicates dropped). With `among_only`, a match
/// counts only when both teams are listed.
fn tally(matches: &[Match], teams: &[TeamId], among_only: bool) -> Vec<StandingRow> {
    let mut seen = HashSet::new();
    let mut rows: Vec<StandingRow> = teams
        .iter()
        .filter(|t| seen.insert(**t))
        .map(|t| StandingRow::new(*t))
        .collect();
    let index: HashMap<TeamId, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.team_id, i))
        .collect();

    for m in matches.iter().filter(|m| m.is_complete()) {
        let Some((s1, s2)) = m.scores() else {
            continue;
        };
        let i1 = index.get(&m.team1).copied();
        let i2 = index.get(&m.team2).copied();
        if among_only && (i1.is_none() || i2.is_none()) {
            continue;
        }
        if let Some(i) = i1 {
            rows[i].record(s1, s2);
        }
        if let Some(i) = i2 {
            rows[i].record(s2, s1);
        }
    }
    rows
}
