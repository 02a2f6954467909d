//! Outbound mirror of committed local writes.
//!
//! Entries are queued after a unit of work commits and pushed to a
//! [`RemoteSink`] on an explicit flush. A failing remote never fails the local
//! write: entries stay queued until they are pushed or run out of attempts.

use crate::models::{MatchId, MatchStatus, StageId, StageName, TeamId, TournamentId};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use uuid::Uuid;

/// A committed change worth mirroring.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    TournamentCreated {
        tournament_id: TournamentId,
        name: String,
    },
    TeamBound {
        tournament_id: TournamentId,
        team_id: TeamId,
    },
    GroupsDrawn {
        tournament_id: TournamentId,
        placed: usize,
    },
    MatchesGenerated {
        tournament_id: TournamentId,
        stage_id: StageId,
        stage: StageName,
        matches: usize,
    },
    MatchesCleared {
        stage_id: StageId,
        removed: usize,
    },
    ResultReported {
        match_id: MatchId,
        scores: (u32, u32),
        status: MatchStatus,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub id: Uuid,
    pub queued_at: DateTime<Utc>,
    pub event: SyncEvent,
    /// Failed pushes so far.
    pub attempts: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SyncError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("remote rejected entry: {0}")]
    Rejected(String),
}

/// Where entries are mirrored to.
pub trait RemoteSink {
    fn push(&mut self, entry: &SyncEntry) -> Result<(), SyncError>;
}

/// Outcome of one [`SyncQueue::flush`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FlushReport {
    pub pushed: usize,
    pub retained: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct SyncQueue {
    entries: VecDeque<SyncEntry>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: SyncEvent) {
        debug!("queued sync event {:?}", event);
        self.entries.push_back(SyncEntry {
            id: Uuid::new_v4(),
            queued_at: Utc::now(),
            event,
            attempts: 0,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SyncEntry> {
        self.entries.iter()
    }

    /// Push every queued entry in order. Entries that fail are kept for the
    /// next flush, or dropped once they have failed `max_attempts` times.
    pub fn flush<S: RemoteSink + ?Sized>(&mut self, sink: &mut S, max_attempts: u32) -> FlushReport {
        let mut report = FlushReport::default();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        while let Some(mut entry) = self.entries.pop_front() {
            match sink.push(&entry) {
                Ok(()) => report.pushed += 1,
                Err(e) => {
                    entry.attempts += 1;
                    if entry.attempts >= max_attempts {
                        warn!(
                            "dropping sync entry {} after {} attempts: {}",
                            entry.id, entry.attempts, e
                        );
                        report.dropped += 1;
                    } else {
                        debug!("sync entry {} failed, will retry: {}", entry.id, e);
                        kept.push_back(entry);
                    }
                }
            }
        }
        report.retained = kept.len();
        self.entries = kept;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts entries once `fail_for` pushes have failed.
    struct FlakySink {
        fail_for: u32,
        received: Vec<SyncEntry>,
    }

    impl RemoteSink for FlakySink {
        fn push(&mut self, entry: &SyncEntry) -> Result<(), SyncError> {
            if self.fail_for > 0 {
                self.fail_for -= 1;
                return Err(SyncError::Unavailable("offline".into()));
            }
            self.received.push(entry.clone());
            Ok(())
        }
    }

    fn event() -> SyncEvent {
        SyncEvent::MatchesCleared {
            stage_id: Uuid::new_v4(),
            removed: 3,
        }
    }

    #[test]
    fn flush_pushes_in_order() {
        let mut queue = SyncQueue::new();
        queue.record(event());
        queue.record(event());
        let ids: Vec<Uuid> = queue.entries().map(|e| e.id).collect();
        let mut sink = FlakySink {
            fail_for: 0,
            received: Vec::new(),
        };
        let report = queue.flush(&mut sink, 3);
        assert_eq!(report.pushed, 2);
        assert!(queue.is_empty());
        assert_eq!(sink.received.iter().map(|e| e.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn failed_entries_wait_for_the_next_flush() {
        let mut queue = SyncQueue::new();
        queue.record(event());
        let mut sink = FlakySink {
            fail_for: 1,
            received: Vec::new(),
        };
        let first = queue.flush(&mut sink, 3);
        assert_eq!(first.retained, 1);
        assert_eq!(queue.entries().next().map(|e| e.attempts), Some(1));
        let second = queue.flush(&mut sink, 3);
        assert_eq!(second.pushed, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn entries_are_dropped_after_max_attempts() {
        let mut queue = SyncQueue::new();
        queue.record(event());
        let mut sink = FlakySink {
            fail_for: 10,
            received: Vec::new(),
        };
        queue.flush(&mut sink, 2);
        let report = queue.flush(&mut sink, 2);
        assert_eq!(report.dropped, 1);
        assert!(queue.is_empty());
        assert!(sink.received.is_empty());
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["event"], "matches_cleared");
        assert_eq!(json["removed"], 3);
    }
}
