//! Data structures for the tournament: teams, tournaments, stages, groups, matches.

mod error;
mod game;
mod stage;
mod team;
mod tournament;

pub use error::{
    ConfigError, ErrorKind, InvalidResult, PreconditionError, StoreError, StoreFailure,
    TournamentError,
};
pub use game::{validate_result, Match, MatchId, MatchStatus, NewMatch, Side};
pub use stage::{Group, GroupId, Stage, StageId, StageName, UnknownStageName};
pub use team::{Team, TeamId};
pub use tournament::{Tournament, TournamentId};
