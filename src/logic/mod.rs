//! Tournament progression logic: setup planning, round-robin scheduling,
//! standings, stage status and knockout qualification.

mod knockout;
mod round_robin;
mod setup;
mod standings;
mod status;

pub use knockout::{
    decide_ties, fixtures, pair_in_order, pair_randomly, qualify, Qualification, TieOutcome,
};
pub use round_robin::{round_robin_match_count, schedule, schedule_repeated, Round};
pub use setup::{auto_group_size, ko_ladder, plan, GroupPlan, TournamentPlan, MIN_TEAMS};
pub use standings::{compute_table, primary_table, GroupStandings, StandingRow, Standings};
pub use status::{
    expected_group_matches, resolve, stage_status, MatchCounts, StageInput, StageProgress,
    StageRef, StageStatus, StatusInputs, TournamentStatus, SETUP_STAGE_NAME,
};
