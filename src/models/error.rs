//! Error types. The engine classifies failures; formatting them for people is
//! left to the caller.

use crate::models::stage::GroupId;
use crate::models::team::TeamId;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`TournamentError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Precondition,
    Persistence,
    TieBreak,
    InvalidInput,
    NotFound,
}

/// Rejected tournament set-up. Raised before anything is written.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least {min} teams are needed, got {got}")]
    TooFewTeams { min: u32, got: u32 },
    #[error("group size {size} is not usable for {team_count} teams")]
    InvalidGroupSize { size: u32, team_count: u32 },
    #[error("teams in knockout must be a power of two of at least 2, got {0}")]
    KnockoutNotPowerOfTwo(u32),
    #[error("{teams_in_ko} knockout slots exceed {team_count} teams")]
    KnockoutExceedsTeams { teams_in_ko: u32, team_count: u32 },
    #[error("best-of must be odd and at least 1, got {0}")]
    InvalidBestOf(u32),
    #[error("{needed} slots requested but only {available} teams are available")]
    NotEnoughTeams { needed: usize, available: usize },
    #[error("{given} team names given for {declared} declared teams")]
    TooManyTeamNames { given: usize, declared: u32 },
    #[error("tournament name must not be empty")]
    EmptyName,
}

/// The tournament is not in a state that allows the operation. Nothing was
/// changed.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PreconditionError {
    #[error("stage {stage_index} is not complete")]
    StageNotComplete { stage_index: u32 },
    #[error("tournament is already complete")]
    TournamentFinished,
    #[error("stage {stage_index} already has matches")]
    StageAlreadyGenerated { stage_index: u32 },
    #[error("stage {stage_index} cannot be regenerated once play has started")]
    StageStarted { stage_index: u32 },
    #[error("no generated stage to regenerate")]
    NothingGenerated,
    #[error("results of stage {stage_index} are locked by the following stage")]
    ResultsLocked { stage_index: u32 },
    #[error("tournament already has all {0} teams")]
    TournamentFull(u32),
    #[error("team {0} is already part of the tournament")]
    TeamAlreadyBound(TeamId),
    #[error("team {0} is not part of the tournament")]
    TeamNotInTournament(TeamId),
    #[error("team {0} is assigned more than once")]
    TeamAssignedTwice(TeamId),
    #[error("group {group} holds at most {size} teams")]
    GroupOverfull { group: String, size: u32 },
    #[error("group {0} does not belong to the tournament")]
    ForeignGroup(GroupId),
    #[error("groups can only be drawn before group matches exist")]
    GroupsLocked,
}

/// A reported score that breaks the match invariants.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InvalidResult {
    #[error("a scheduled match carries no score")]
    ScoreOnScheduled,
    #[error("a started match needs both scores")]
    MissingScore,
    #[error("a knockout match cannot be completed level")]
    KnockoutDraw,
    #[error("a result cannot reset a match to scheduled")]
    ResetToScheduled,
    #[error("a team cannot play itself")]
    SelfMatch,
}

/// Why a store operation failed.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreFailure {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("referenced record does not exist")]
    MissingReference,
    #[error("record not found")]
    NotFound,
    #[error("transaction error: {0}")]
    Transaction(String),
}

/// A failed Entity Store operation with enough context to log or retry.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("store operation `{operation}` failed for {key}: {failure}")]
pub struct StoreError {
    pub operation: &'static str,
    pub key: String,
    pub failure: StoreFailure,
}

impl StoreError {
    pub fn new(operation: &'static str, key: impl ToString, failure: StoreFailure) -> Self {
        Self {
            operation,
            key: key.to_string(),
            failure,
        }
    }
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("{0}")]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Ranking tie that direct comparison cannot separate but that decides
    /// who advances.
    #[error("tie between {} teams cannot be broken", teams.len())]
    TieUnresolved { teams: Vec<TeamId> },
    #[error("invalid match result: {0}")]
    InvalidResult(#[from] InvalidResult),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
}

impl TournamentError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        TournamentError::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Configuration(_) => ErrorKind::Configuration,
            TournamentError::Precondition(_) => ErrorKind::Precondition,
            TournamentError::Store(_) => ErrorKind::Persistence,
            TournamentError::TieUnresolved { .. } => ErrorKind::TieBreak,
            TournamentError::InvalidResult(_) => ErrorKind::InvalidInput,
            TournamentError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}
