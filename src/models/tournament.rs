//! Tournament record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// A tournament header. The stage/group skeleton and the bound teams live in
/// separate records keyed by `id`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    /// Unique across the store.
    pub name: String,
    /// Declared target team count. Fewer bound teams means the tournament is
    /// still recruiting.
    pub num_teams: u32,
    /// Free-form display style (colors etc.), opaque to the engine.
    pub style: Option<String>,
}
