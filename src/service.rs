//! Tournament operations for the application layer, over any [`EntityStore`].
//!
//! Reads go straight to the store. Every multi-row write runs in one
//! [`UnitOfWork`] and is queued for the remote mirror once committed.

use crate::config::EngineConfig;
use crate::logic::{
    compute_table, decide_ties, fixtures, pair_in_order, pair_randomly, plan, primary_table,
    qualify, resolve, schedule_repeated, GroupStandings, StageStatus, StandingRow,
    TournamentStatus,
};
use crate::models::{
    validate_result, ConfigError, GroupId, InvalidResult, Match, MatchId, MatchStatus, NewMatch,
    PreconditionError, Stage, StageName, TeamId, Tournament, TournamentError, TournamentId,
};
use crate::store::{EntityStore, MatchFilter, UnitOfWork};
use crate::sync::{FlushReport, RemoteSink, SyncEvent, SyncQueue};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;

pub type ServiceResult<T> = Result<T, TournamentError>;

/// Everything needed to set up a tournament.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateTournament {
    pub name: String,
    pub num_teams: u32,
    #[serde(default)]
    pub style: Option<String>,
    /// Largest group wanted; picked automatically when absent.
    #[serde(default)]
    pub group_size: Option<u32>,
    pub teams_in_ko: u32,
    /// Initial team list. Unknown names are created.
    #[serde(default)]
    pub teams: Vec<String>,
}

/// The full membership of one group in a manual draw.
#[derive(Clone, Debug, Deserialize)]
pub struct GroupDraw {
    pub group_id: GroupId,
    pub teams: Vec<TeamId>,
}

pub struct TournamentService<S: EntityStore> {
    store: S,
    config: EngineConfig,
    rng: StdRng,
    sync: SyncQueue,
}

impl<S: EntityStore> TournamentService<S> {
    pub fn new(store: S, config: EngineConfig) -> ServiceResult<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            store,
            config,
            rng,
            sync: SyncQueue::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sync_queue(&self) -> &SyncQueue {
        &self.sync
    }

    /// Plan the layout, then write the tournament, its stages and groups, and
    /// the initial teams in one unit of work. Nothing is written when the plan
    /// is rejected.
    pub fn create_tournament(&mut self, request: CreateTournament) -> ServiceResult<TournamentId> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        if request.teams.len() > request.num_teams as usize {
            return Err(ConfigError::TooManyTeamNames {
                given: request.teams.len(),
                declared: request.num_teams,
            }
            .into());
        }
        let layout = plan(request.num_teams, request.group_size, request.teams_in_ko)?;

        let mut uow = UnitOfWork::begin(&mut self.store)?;
        let tournament_id =
            uow.create_tournament(name, request.num_teams, request.style.as_deref())?;
        for (index, stage_name) in layout.stages() {
            let best_of = if stage_name.is_group() {
                1
            } else {
                self.config.best_of
            };
            let stage_id = uow.create_stage(tournament_id, index, stage_name, best_of)?;
            if stage_name.is_group() {
                for group in &layout.groups {
                    uow.create_group(stage_id, group.size, &group.name, group.rounds)?;
                }
            }
        }
        let mut bound = HashSet::new();
        for team_name in &request.teams {
            let team_id = find_or_create_team(&mut *uow, team_name.trim())?;
            if !bound.insert(team_id) {
                return Err(PreconditionError::TeamAlreadyBound(team_id).into());
            }
            uow.bind_team(tournament_id, team_id)?;
        }
        uow.commit()?;

        info!(
            "Created tournament {} ({} teams, {} groups, {} knockout stages)",
            name,
            request.num_teams,
            layout.groups.len(),
            layout.ko_ladder.len()
        );
        self.sync.record(SyncEvent::TournamentCreated {
            tournament_id,
            name: name.to_string(),
        });
        Ok(tournament_id)
    }

    pub fn get_tournament(&self, tournament_id: TournamentId) -> ServiceResult<Tournament> {
        self.store
            .get_tournament(tournament_id)?
            .ok_or_else(|| TournamentError::not_found("tournament", tournament_id))
    }

    pub fn list_tournaments(&self) -> ServiceResult<Vec<Tournament>> {
        Ok(self.store.list_tournaments()?)
    }

    /// Bind a team, created by name if new, while the tournament is still
    /// recruiting.
    pub fn add_team(&mut self, tournament_id: TournamentId, name: &str) -> ServiceResult<TeamId> {
        let tournament = self.get_tournament(tournament_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        let bound = self.store.tournament_teams(tournament_id)?;
        if bound.len() >= tournament.num_teams as usize {
            return Err(PreconditionError::TournamentFull(tournament.num_teams).into());
        }

        let mut uow = UnitOfWork::begin(&mut self.store)?;
        let team_id = find_or_create_team(&mut *uow, name)?;
        if bound.contains(&team_id) {
            return Err(PreconditionError::TeamAlreadyBound(team_id).into());
        }
        uow.bind_team(tournament_id, team_id)?;
        uow.commit()?;

        info!("Team {} joined tournament {}", name, tournament.name);
        self.sync.record(SyncEvent::TeamBound {
            tournament_id,
            team_id,
        });
        Ok(team_id)
    }

    pub fn get_tournament_status(
        &self,
        tournament_id: TournamentId,
    ) -> ServiceResult<TournamentStatus> {
        self.get_tournament(tournament_id)?;
        let inputs = self.store.query_stage_status_inputs(tournament_id)?;
        Ok(resolve(&inputs))
    }

    /// Ranked table of every group, in group order.
    pub fn get_group_standings(
        &self,
        tournament_id: TournamentId,
    ) -> ServiceResult<Vec<GroupStandings>> {
        let stage = self.group_stage(tournament_id)?;
        let matches = self.store.query_matches(&MatchFilter::stage(stage.id))?;
        let mut tables = Vec::new();
        for group in self.store.query_groups(stage.id)? {
            let members = self.store.group_members(group.id)?;
            let group_matches: Vec<Match> = matches
                .iter()
                .filter(|m| members.contains(&m.team1) && members.contains(&m.team2))
                .cloned()
                .collect();
            let standings = compute_table(&group_matches, &members);
            tables.push(GroupStandings { group, standings });
        }
        Ok(tables)
    }

    /// Replace the membership of the listed groups. Allowed until the group
    /// matches are generated.
    pub fn draw_groups(
        &mut self,
        tournament_id: TournamentId,
        draw: &[GroupDraw],
    ) -> ServiceResult<()> {
        let stage = self.group_stage(tournament_id)?;
        self.ensure_groups_open(&stage)?;
        let bound: HashSet<TeamId> = self.store.tournament_teams(tournament_id)?.into_iter().collect();
        let groups = self.store.query_groups(stage.id)?;

        let mut seen = HashSet::new();
        for group in groups.iter().filter(|g| !draw.iter().any(|d| d.group_id == g.id)) {
            seen.extend(self.store.group_members(group.id)?);
        }
        for entry in draw {
            let group = groups
                .iter()
                .find(|g| g.id == entry.group_id)
                .ok_or(PreconditionError::ForeignGroup(entry.group_id))?;
            if entry.teams.len() > group.size as usize {
                return Err(PreconditionError::GroupOverfull {
                    group: group.name.clone(),
                    size: group.size,
                }
                .into());
            }
            for team in &entry.teams {
                if !bound.contains(team) {
                    return Err(PreconditionError::TeamNotInTournament(*team).into());
                }
                if !seen.insert(*team) {
                    return Err(PreconditionError::TeamAssignedTwice(*team).into());
                }
            }
        }

        let mut uow = UnitOfWork::begin(&mut self.store)?;
        for entry in draw {
            uow.clear_group_members(entry.group_id)?;
            for team in &entry.teams {
                uow.add_group_member(entry.group_id, *team)?;
            }
        }
        uow.commit()?;

        let placed = draw.iter().map(|d| d.teams.len()).sum();
        info!("Drew {} teams into {} groups", placed, draw.len());
        self.sync.record(SyncEvent::GroupsDrawn {
            tournament_id,
            placed,
        });
        Ok(())
    }

    /// Fill every open group slot with a uniformly chosen unplaced team.
    /// Returns how many teams were placed.
    pub fn auto_assign(&mut self, tournament_id: TournamentId) -> ServiceResult<usize> {
        let stage = self.group_stage(tournament_id)?;
        self.ensure_groups_open(&stage)?;
        let groups = self.store.query_groups(stage.id)?;

        let mut placed = HashSet::new();
        let mut open_slots = Vec::new();
        for group in &groups {
            let members = self.store.group_members(group.id)?;
            let open = (group.size as usize).saturating_sub(members.len());
            open_slots.extend(std::iter::repeat(group.id).take(open));
            placed.extend(members);
        }
        let mut unplaced: Vec<TeamId> = self
            .store
            .tournament_teams(tournament_id)?
            .into_iter()
            .filter(|t| !placed.contains(t))
            .collect();

        let mut assignments = Vec::new();
        for group_id in open_slots {
            if unplaced.is_empty() {
                break;
            }
            let pick = self.rng.gen_range(0..unplaced.len());
            assignments.push((group_id, unplaced.remove(pick)));
        }

        let mut uow = UnitOfWork::begin(&mut self.store)?;
        for (group_id, team_id) in &assignments {
            uow.add_group_member(*group_id, *team_id)?;
        }
        uow.commit()?;

        info!("Auto-assigned {} teams", assignments.len());
        if !assignments.is_empty() {
            self.sync.record(SyncEvent::GroupsDrawn {
                tournament_id,
                placed: assignments.len(),
            });
        }
        Ok(assignments.len())
    }

    /// Create the matches of the stage after the current one. The current
    /// stage (or the set-up phase) must be complete.
    pub fn generate_next_stage_matches(
        &mut self,
        tournament_id: TournamentId,
    ) -> ServiceResult<Vec<Match>> {
        let status = self.get_tournament_status(tournament_id)?;
        if status.is_finished() {
            return Err(PreconditionError::TournamentFinished.into());
        }
        if status.status != StageStatus::Complete {
            return Err(PreconditionError::StageNotComplete {
                stage_index: status.current_stage_index,
            }
            .into());
        }
        let next = status
            .next_stage
            .ok_or(PreconditionError::TournamentFinished)?;
        let already = status
            .stages
            .iter()
            .any(|p| p.stage.stage_id == next.stage_id && p.counts.total() > 0);
        if already {
            return Err(PreconditionError::StageAlreadyGenerated {
                stage_index: next.stage_index,
            }
            .into());
        }

        let stages = self.store.stages(tournament_id)?;
        let stage = stages
            .iter()
            .find(|s| s.id == next.stage_id)
            .cloned()
            .ok_or_else(|| TournamentError::not_found("stage", next.stage_id))?;
        let pairs = self.draw_fixtures(tournament_id, &stages, &stage)?;
        self.write_fixtures(tournament_id, &stage, &pairs, false)
    }

    /// Delete and redraw the matches of the current stage while none of them
    /// has started.
    pub fn regenerate_current_stage(
        &mut self,
        tournament_id: TournamentId,
    ) -> ServiceResult<Vec<Match>> {
        let status = self.get_tournament_status(tournament_id)?;
        let current = match status.current_stage() {
            Some(progress) if status.current_stage_index > 0 => progress.stage,
            _ => return Err(PreconditionError::NothingGenerated.into()),
        };
        if status.status != StageStatus::Initialized {
            return Err(PreconditionError::StageStarted {
                stage_index: current.stage_index,
            }
            .into());
        }

        let stages = self.store.stages(tournament_id)?;
        let stage = stages
            .iter()
            .find(|s| s.id == current.stage_id)
            .cloned()
            .ok_or_else(|| TournamentError::not_found("stage", current.stage_id))?;
        let pairs = self.draw_fixtures(tournament_id, &stages, &stage)?;
        self.write_fixtures(tournament_id, &stage, &pairs, true)
    }

    /// Record a score. Scores of a stage are frozen once the following stage
    /// has matches.
    pub fn report_match_result(
        &mut self,
        match_id: MatchId,
        team1_score: u32,
        team2_score: u32,
        status: MatchStatus,
    ) -> ServiceResult<Match> {
        let game = self
            .store
            .get_match(match_id)?
            .ok_or_else(|| TournamentError::not_found("match", match_id))?;
        if status == MatchStatus::Scheduled {
            return Err(InvalidResult::ResetToScheduled.into());
        }
        let stage = self
            .store
            .get_stage(game.stage_id)?
            .ok_or_else(|| TournamentError::not_found("stage", game.stage_id))?;
        validate_result(
            (Some(team1_score), Some(team2_score)),
            status,
            stage.name.is_knockout(),
        )?;

        let following = self
            .store
            .stages(stage.tournament_id)?
            .into_iter()
            .find(|s| s.stage_index == stage.stage_index + 1);
        if let Some(following) = following {
            if !self.store.query_matches(&MatchFilter::stage(following.id))?.is_empty() {
                return Err(PreconditionError::ResultsLocked {
                    stage_index: stage.stage_index,
                }
                .into());
            }
        }

        let scores = (team1_score, team2_score);
        self.store.update_match(match_id, Some(scores), status)?;
        info!(
            "Match {} in stage {}: {}-{} ({:?})",
            match_id, stage.name, team1_score, team2_score, status
        );
        self.sync.record(SyncEvent::ResultReported {
            match_id,
            scores,
            status,
        });
        self.store
            .get_match(match_id)?
            .ok_or_else(|| TournamentError::not_found("match", match_id))
    }

    /// Every match of the tournament, stage by stage.
    pub fn tournament_matches(&self, tournament_id: TournamentId) -> ServiceResult<Vec<Match>> {
        self.get_tournament(tournament_id)?;
        let mut matches = Vec::new();
        for stage in self.store.stages(tournament_id)? {
            matches.extend(self.store.query_matches(&MatchFilter::stage(stage.id))?);
        }
        Ok(matches)
    }

    /// Primary-order table over every completed match in the store, across
    /// tournaments. No direct-comparison tie-break.
    pub fn all_time_table(&self) -> ServiceResult<Vec<StandingRow>> {
        let matches = self
            .store
            .query_matches(&MatchFilter::all().with_status(MatchStatus::Complete))?;
        let teams: Vec<TeamId> = self.store.list_teams()?.iter().map(|t| t.id).collect();
        Ok(primary_table(&matches, &teams))
    }

    /// Push queued changes to `sink`. Never fails; see [`SyncQueue::flush`].
    pub fn flush_sync<R: RemoteSink + ?Sized>(&mut self, sink: &mut R) -> FlushReport {
        let report = self.sync.flush(sink, self.config.max_sync_attempts);
        if report.dropped > 0 {
            warn!("{} sync entries dropped", report.dropped);
        }
        report
    }

    fn group_stage(&self, tournament_id: TournamentId) -> ServiceResult<Stage> {
        self.get_tournament(tournament_id)?;
        self.store
            .stages(tournament_id)?
            .into_iter()
            .find(|s| s.name.is_group())
            .ok_or_else(|| TournamentError::not_found("group stage", tournament_id))
    }

    fn ensure_groups_open(&self, group_stage: &Stage) -> ServiceResult<()> {
        if self
            .store
            .query_matches(&MatchFilter::stage(group_stage.id))?
            .is_empty()
        {
            Ok(())
        } else {
            Err(PreconditionError::GroupsLocked.into())
        }
    }

    /// `(home, away)` fixtures for `stage`, drawn from the state of the
    /// stages before it.
    fn draw_fixtures(
        &mut self,
        tournament_id: TournamentId,
        stages: &[Stage],
        stage: &Stage,
    ) -> ServiceResult<Vec<(TeamId, TeamId)>> {
        if stage.name.is_group() {
            let mut pairs = Vec::new();
            for group in self.store.query_groups(stage.id)? {
                let members = self.store.group_members(group.id)?;
                pairs.extend(schedule_repeated(&members, group.rounds).into_iter().flatten());
            }
            return Ok(pairs);
        }

        let previous = stages
            .iter()
            .rev()
            .find(|s| s.stage_index < stage.stage_index)
            .ok_or_else(|| TournamentError::not_found("previous stage", stage.id))?;

        let pairs = if previous.name.is_group() {
            let tables = self.get_group_standings(tournament_id)?;
            let group_matches = self.store.query_matches(&MatchFilter::stage(previous.id))?;
            let qualified = qualify(&tables, &group_matches, stage.name.slots() as usize)?;
            pair_randomly(&qualified.teams(), &mut self.rng)
        } else {
            // The third-place match and the final both draw on the last
            // regular round, the semifinals.
            let source = stages
                .iter()
                .rev()
                .filter(|s| s.stage_index < stage.stage_index)
                .find(|s| matches!(s.name, StageName::Round(_)))
                .ok_or_else(|| TournamentError::not_found("knockout round", stage.id))?;
            let outcomes = decide_ties(&self.store.query_matches(&MatchFilter::stage(source.id))?)?;
            let teams: Vec<TeamId> = if stage.name == StageName::ThirdPlace {
                outcomes.iter().map(|o| o.loser).collect()
            } else {
                outcomes.iter().map(|o| o.winner).collect()
            };
            pair_in_order(&teams)
        };

        if pairs.len() != stage.name.pairings() as usize {
            return Err(ConfigError::NotEnoughTeams {
                needed: stage.name.slots() as usize,
                available: pairs.len() * 2,
            }
            .into());
        }
        Ok(fixtures(&pairs, stage.best_of))
    }

    fn write_fixtures(
        &mut self,
        tournament_id: TournamentId,
        stage: &Stage,
        pairs: &[(TeamId, TeamId)],
        replace: bool,
    ) -> ServiceResult<Vec<Match>> {
        let mut uow = UnitOfWork::begin(&mut self.store)?;
        let removed = if replace {
            uow.delete_matches(stage.id)?
        } else {
            0
        };
        for &(home, away) in pairs {
            uow.create_match(NewMatch::scheduled(home, away, stage.id))?;
        }
        uow.commit()?;

        info!(
            "Generated {} matches for stage {} ({})",
            pairs.len(),
            stage.stage_index,
            stage.name
        );
        if replace {
            self.sync.record(SyncEvent::MatchesCleared {
                stage_id: stage.id,
                removed,
            });
        }
        self.sync.record(SyncEvent::MatchesGenerated {
            tournament_id,
            stage_id: stage.id,
            stage: stage.name,
            matches: pairs.len(),
        });
        Ok(self.store.query_matches(&MatchFilter::stage(stage.id))?)
    }
}

fn find_or_create_team<S: EntityStore + ?Sized>(store: &mut S, name: &str) -> ServiceResult<TeamId> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName.into());
    }
    match store.find_team_by_name(name)? {
        Some(id) => Ok(id),
        None => Ok(store.create_team(name)?),
    }
}
