//! Tournament planner: group stage and knockout progression over an abstract
//! entity store.

pub mod config;
pub mod logic;
pub mod models;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{EngineConfig, ServerConfig};
pub use logic::{
    compute_table, plan, resolve, schedule, GroupStandings, StageStatus, StandingRow, Standings,
    TournamentPlan, TournamentStatus,
};
pub use models::{
    ErrorKind, Group, GroupId, Match, MatchId, MatchStatus, Stage, StageId, StageName, Team,
    TeamId, Tournament, TournamentError, TournamentId,
};
pub use service::{CreateTournament, GroupDraw, ServiceResult, TournamentService};
pub use store::{EntityStore, MatchFilter, MemoryStore, UnitOfWork};
pub use sync::{FlushReport, RemoteSink, SyncEntry, SyncError, SyncEvent, SyncQueue};
