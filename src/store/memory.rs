//! In-memory Entity Store, used by the web binary and the tests.

use super::{EntityStore, MatchFilter, StoreResult};
use crate::models::{
    Group, GroupId, Match, MatchId, MatchStatus, NewMatch, Stage, StageId, StageName, StoreError,
    StoreFailure, Team, TeamId, Tournament, TournamentId,
};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
struct Tables {
    teams: Vec<Team>,
    tournaments: Vec<Tournament>,
    tournament_teams: Vec<(TournamentId, TeamId)>,
    stages: Vec<Stage>,
    groups: Vec<Group>,
    group_members: Vec<(GroupId, TeamId)>,
    matches: Vec<Match>,
}

/// Rows live in plain vectors in insertion order. An open transaction keeps a
/// snapshot of all tables that rollback restores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    snapshot: Option<Tables>,
    fail_on: Option<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with a transaction error.
    pub fn fail_next(&mut self, operation: &'static str) {
        self.fail_on = Some(operation);
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn check(&mut self, operation: &'static str, key: impl ToString) -> StoreResult<()> {
        if self.fail_on == Some(operation) {
            self.fail_on = None;
            return Err(StoreError::new(
                operation,
                key,
                StoreFailure::Transaction("injected failure".to_string()),
            ));
        }
        Ok(())
    }

    fn has_team(&self, id: TeamId) -> bool {
        self.tables.teams.iter().any(|t| t.id == id)
    }
}

impl EntityStore for MemoryStore {
    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::new(
                "begin",
                "store",
                StoreFailure::Transaction("a transaction is already open".to_string()),
            ));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.check("commit", "store")?;
        match self.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::new(
                "commit",
                "store",
                StoreFailure::Transaction("no open transaction".to_string()),
            )),
        }
    }

    fn rollback(&mut self) -> StoreResult<()> {
        match self.snapshot.take() {
            Some(tables) => {
                self.tables = tables;
                Ok(())
            }
            None => Err(StoreError::new(
                "rollback",
                "store",
                StoreFailure::Transaction("no open transaction".to_string()),
            )),
        }
    }

    fn create_team(&mut self, name: &str) -> StoreResult<TeamId> {
        self.check("create_team", name)?;
        if self.tables.teams.iter().any(|t| t.name == name) {
            return Err(StoreError::new(
                "create_team",
                name,
                StoreFailure::UniqueViolation,
            ));
        }
        let id = Uuid::new_v4();
        self.tables.teams.push(Team::new(id, name));
        Ok(id)
    }

    fn find_team_by_name(&self, name: &str) -> StoreResult<Option<TeamId>> {
        Ok(self
            .tables
            .teams
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id))
    }

    fn list_teams(&self) -> StoreResult<Vec<Team>> {
        Ok(self.tables.teams.clone())
    }

    fn create_tournament(
        &mut self,
        name: &str,
        num_teams: u32,
        style: Option<&str>,
    ) -> StoreResult<TournamentId> {
        self.check("create_tournament", name)?;
        if self.tables.tournaments.iter().any(|t| t.name == name) {
            return Err(StoreError::new(
                "create_tournament",
                name,
                StoreFailure::UniqueViolation,
            ));
        }
        let id = Uuid::new_v4();
        self.tables.tournaments.push(Tournament {
            id,
            name: name.to_string(),
            num_teams,
            style: style.map(str::to_string),
        });
        Ok(id)
    }

    fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.tables.tournaments.iter().find(|t| t.id == id).cloned())
    }

    fn list_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        Ok(self.tables.tournaments.clone())
    }

    fn bind_team(&mut self, tournament_id: TournamentId, team_id: TeamId) -> StoreResult<()> {
        let key = format!("{}/{}", tournament_id, team_id);
        self.check("bind_team", &key)?;
        if !self.tables.tournaments.iter().any(|t| t.id == tournament_id)
            || !self.has_team(team_id)
        {
            return Err(StoreError::new(
                "bind_team",
                key,
                StoreFailure::MissingReference,
            ));
        }
        if self.tables.tournament_teams.contains(&(tournament_id, team_id)) {
            return Err(StoreError::new(
                "bind_team",
                key,
                StoreFailure::UniqueViolation,
            ));
        }
        self.tables.tournament_teams.push((tournament_id, team_id));
        Ok(())
    }

    fn tournament_teams(&self, tournament_id: TournamentId) -> StoreResult<Vec<TeamId>> {
        Ok(self
            .tables
            .tournament_teams
            .iter()
            .filter(|(t, _)| *t == tournament_id)
            .map(|(_, team)| *team)
            .collect())
    }

    fn create_stage(
        &mut self,
        tournament_id: TournamentId,
        stage_index: u32,
        name: StageName,
        best_of: u32,
    ) -> StoreResult<StageId> {
        let key = format!("{}#{}", tournament_id, stage_index);
        self.check("create_stage", &key)?;
        if !self.tables.tournaments.iter().any(|t| t.id == tournament_id) {
            return Err(StoreError::new(
                "create_stage",
                key,
                StoreFailure::MissingReference,
            ));
        }
        if self
            .tables
            .stages
            .iter()
            .any(|s| s.tournament_id == tournament_id && s.stage_index == stage_index)
        {
            return Err(StoreError::new(
                "create_stage",
                key,
                StoreFailure::UniqueViolation,
            ));
        }
        let id = Uuid::new_v4();
        self.tables.stages.push(Stage {
            id,
            tournament_id,
            stage_index,
            name,
            best_of,
        });
        Ok(id)
    }

    fn get_stage(&self, id: StageId) -> StoreResult<Option<Stage>> {
        Ok(self.tables.stages.iter().find(|s| s.id == id).cloned())
    }

    fn stages(&self, tournament_id: TournamentId) -> StoreResult<Vec<Stage>> {
        let mut stages: Vec<Stage> = self
            .tables
            .stages
            .iter()
            .filter(|s| s.tournament_id == tournament_id)
            .cloned()
            .collect();
        stages.sort_by_key(|s| s.stage_index);
        Ok(stages)
    }

    fn create_group(
        &mut self,
        stage_id: StageId,
        size: u32,
        name: &str,
        rounds: u32,
    ) -> StoreResult<GroupId> {
        let key = format!("{}/{}", stage_id, name);
        self.check("create_group", &key)?;
        if !self.tables.stages.iter().any(|s| s.id == stage_id) {
            return Err(StoreError::new(
                "create_group",
                key,
                StoreFailure::MissingReference,
            ));
        }
        if self
            .tables
            .groups
            .iter()
            .any(|g| g.stage_id == stage_id && g.name == name)
        {
            return Err(StoreError::new(
                "create_group",
                key,
                StoreFailure::UniqueViolation,
            ));
        }
        let id = Uuid::new_v4();
        self.tables.groups.push(Group {
            id,
            stage_id,
            name: name.to_string(),
            size,
            rounds,
        });
        Ok(id)
    }

    fn add_group_member(&mut self, group_id: GroupId, team_id: TeamId) -> StoreResult<()> {
        let key = format!("{}/{}", group_id, team_id);
        self.check("add_group_member", &key)?;
        if !self.tables.groups.iter().any(|g| g.id == group_id) || !self.has_team(team_id) {
            return Err(StoreError::new(
                "add_group_member",
                key,
                StoreFailure::MissingReference,
            ));
        }
        if self.tables.group_members.contains(&(group_id, team_id)) {
            return Err(StoreError::new(
                "add_group_member",
                key,
                StoreFailure::UniqueViolation,
            ));
        }
        self.tables.group_members.push((group_id, team_id));
        Ok(())
    }

    fn clear_group_members(&mut self, group_id: GroupId) -> StoreResult<()> {
        self.check("clear_group_members", group_id)?;
        self.tables.group_members.retain(|(g, _)| *g != group_id);
        Ok(())
    }

    fn query_groups(&self, stage_id: StageId) -> StoreResult<Vec<Group>> {
        Ok(self
            .tables
            .groups
            .iter()
            .filter(|g| g.stage_id == stage_id)
            .cloned()
            .collect())
    }

    fn group_members(&self, group_id: GroupId) -> StoreResult<Vec<TeamId>> {
        Ok(self
            .tables
            .group_members
            .iter()
            .filter(|(g, _)| *g == group_id)
            .map(|(_, t)| *t)
            .collect())
    }

    fn create_match(&mut self, new: NewMatch) -> StoreResult<MatchId> {
        let key = format!("{}/{}-{}", new.stage_id, new.team1, new.team2);
        self.check("create_match", &key)?;
        if !self.tables.stages.iter().any(|s| s.id == new.stage_id)
            || !self.has_team(new.team1)
            || !self.has_team(new.team2)
        {
            return Err(StoreError::new(
                "create_match",
                key,
                StoreFailure::MissingReference,
            ));
        }
        let id = Uuid::new_v4();
        self.tables.matches.push(new.into_match(id));
        Ok(id)
    }

    fn update_match(
        &mut self,
        id: MatchId,
        scores: Option<(u32, u32)>,
        status: MatchStatus,
    ) -> StoreResult<()> {
        self.check("update_match", id)?;
        let m = self
            .tables
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::new("update_match", id, StoreFailure::NotFound))?;
        m.team1_score = scores.map(|s| s.0);
        m.team2_score = scores.map(|s| s.1);
        m.status = status;
        Ok(())
    }

    fn delete_matches(&mut self, stage_id: StageId) -> StoreResult<usize> {
        self.check("delete_matches", stage_id)?;
        let before = self.tables.matches.len();
        self.tables.matches.retain(|m| m.stage_id != stage_id);
        Ok(before - self.tables.matches.len())
    }

    fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        Ok(self.tables.matches.iter().find(|m| m.id == id).cloned())
    }

    fn query_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<Match>> {
        Ok(self
            .tables
            .matches
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }
}
