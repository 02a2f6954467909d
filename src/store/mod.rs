//! Entity Store interface.
//!
//! The engine reads and writes tournaments only through [`EntityStore`].
//! Multi-row mutations run inside a [`UnitOfWork`], which rolls back unless
//! it is committed.

mod memory;

pub use memory::MemoryStore;

use crate::logic::{expected_group_matches, MatchCounts, StageInput, StatusInputs};
use crate::models::{
    Group, GroupId, Match, MatchId, MatchStatus, NewMatch, Stage, StageId, StageName, StoreError,
    StoreFailure, Team, TeamId, Tournament, TournamentId,
};
use log::{debug, warn};
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

pub type StoreResult<T> = Result<T, StoreError>;

/// Which matches to return. Empty fields match everything.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MatchFilter {
    pub stage_id: Option<StageId>,
    pub status: Option<MatchStatus>,
}

impl MatchFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn stage(stage_id: StageId) -> Self {
        Self {
            stage_id: Some(stage_id),
            status: None,
        }
    }

    pub fn with_status(mut self, status: MatchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, m: &Match) -> bool {
        self.stage_id.map_or(true, |s| m.stage_id == s) && self.status.map_or(true, |s| m.status == s)
    }
}

/// Persistence for tournaments, teams, stages, groups and matches.
///
/// Single writer: callers never interleave two units of work. Lists come
/// back in creation order unless stated otherwise.
pub trait EntityStore {
    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;

    /// Fails with [`StoreFailure::UniqueViolation`] for a taken name.
    fn create_team(&mut self, name: &str) -> StoreResult<TeamId>;
    fn find_team_by_name(&self, name: &str) -> StoreResult<Option<TeamId>>;
    fn list_teams(&self) -> StoreResult<Vec<Team>>;

    fn create_tournament(
        &mut self,
        name: &str,
        num_teams: u32,
        style: Option<&str>,
    ) -> StoreResult<TournamentId>;
    fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;
    fn list_tournaments(&self) -> StoreResult<Vec<Tournament>>;
    fn bind_team(&mut self, tournament_id: TournamentId, team_id: TeamId) -> StoreResult<()>;
    fn tournament_teams(&self, tournament_id: TournamentId) -> StoreResult<Vec<TeamId>>;

    fn create_stage(
        &mut self,
        tournament_id: TournamentId,
        stage_index: u32,
        name: StageName,
        best_of: u32,
    ) -> StoreResult<StageId>;
    fn get_stage(&self, id: StageId) -> StoreResult<Option<Stage>>;
    /// Ascending by `stage_index`.
    fn stages(&self, tournament_id: TournamentId) -> StoreResult<Vec<Stage>>;

    fn create_group(
        &mut self,
        stage_id: StageId,
        size: u32,
        name: &str,
        rounds: u32,
    ) -> StoreResult<GroupId>;
    fn add_group_member(&mut self, group_id: GroupId, team_id: TeamId) -> StoreResult<()>;
    fn clear_group_members(&mut self, group_id: GroupId) -> StoreResult<()>;
    fn query_groups(&self, stage_id: StageId) -> StoreResult<Vec<Group>>;
    fn group_members(&self, group_id: GroupId) -> StoreResult<Vec<TeamId>>;

    fn create_match(&mut self, new: NewMatch) -> StoreResult<MatchId>;
    fn update_match(
        &mut self,
        id: MatchId,
        scores: Option<(u32, u32)>,
        status: MatchStatus,
    ) -> StoreResult<()>;
    /// Returns how many matches were removed.
    fn delete_matches(&mut self, stage_id: StageId) -> StoreResult<usize>;
    fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>>;
    fn query_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<Match>>;

    /// Team and match counts the stage status resolver works from.
    fn query_stage_status_inputs(&self, tournament_id: TournamentId) -> StoreResult<StatusInputs> {
        let tournament = self.get_tournament(tournament_id)?.ok_or_else(|| {
            StoreError::new(
                "query_stage_status_inputs",
                tournament_id,
                StoreFailure::NotFound,
            )
        })?;
        let bound: HashSet<TeamId> = self.tournament_teams(tournament_id)?.into_iter().collect();

        let mut placed = 0;
        let mut stages = Vec::new();
        for stage in self.stages(tournament_id)? {
            let matches = self.query_matches(&MatchFilter::stage(stage.id))?;
            let expected = if stage.name.is_group() {
                let mut groups = Vec::new();
                for group in self.query_groups(stage.id)? {
                    let members = self.group_members(group.id)?;
                    placed += members.iter().filter(|t| bound.contains(*t)).count() as u32;
                    groups.push((members.len(), group.rounds));
                }
                expected_group_matches(groups)
            } else {
                stage.expected_knockout_matches()
            };
            stages.push(StageInput {
                stage_id: stage.id,
                stage_index: stage.stage_index,
                name: stage.name,
                expected,
                counts: MatchCounts::tally(&matches),
            });
        }

        Ok(StatusInputs {
            declared_teams: tournament.num_teams,
            bound_teams: bound.len() as u32,
            placed_teams: placed,
            stages,
        })
    }
}

/// An open transaction on a store. Derefs to the store; dropping it without
/// [`UnitOfWork::commit`] rolls everything back.
pub struct UnitOfWork<'a, S: EntityStore + ?Sized> {
    store: &'a mut S,
    committed: bool,
}

impl<'a, S: EntityStore + ?Sized> UnitOfWork<'a, S> {
    pub fn begin(store: &'a mut S) -> StoreResult<Self> {
        store.begin()?;
        Ok(Self {
            store,
            committed: false,
        })
    }

    pub fn commit(mut self) -> StoreResult<()> {
        let result = self.store.commit();
        self.committed = result.is_ok();
        result
    }
}

impl<S: EntityStore + ?Sized> Deref for UnitOfWork<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: EntityStore + ?Sized> DerefMut for UnitOfWork<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: EntityStore + ?Sized> Drop for UnitOfWork<'_, S> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.store.rollback() {
            Ok(()) => debug!("unit of work rolled back"),
            Err(e) => warn!("rollback failed: {}", e),
        }
    }
}
