//! Match scoring: rules, the per-match tracker and the engine interface the
//! service layer drives.

pub mod error;
pub mod events;
pub mod rules;
pub mod tracker;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{ShotRef, Side};

pub use error::{EngineError, EngineResult, InvalidState};
pub use events::ScoringEvent;
pub use tracker::{EntryPhase, LoggedPoint, MatchTracker, SetView, TrackerSnapshot};

/// Operations exposed by a live match.
///
/// Mutating calls return the events they produced. A failed call leaves the
/// committed state untouched; persistence failures can be retried.
pub trait ScoringEngine: Send + Sync {
    /// Identifier of the tracked match.
    fn match_id(&self) -> Uuid;
    /// Read-only view of the whole match.
    fn snapshot(&self) -> TrackerSnapshot;
    /// Side serving the next rally. Pure.
    fn current_server(&self) -> Side;
    /// Points played in the current set.
    fn total_points_in_current_set(&self) -> u32;
    /// Whether a failed commit or undo left writes that still need a retry,
    /// a cancel or a reconcile.
    fn has_unfinished_write(&self) -> bool;

    /// Start a point entry.
    fn select_point_winner(&mut self, side: Side) -> EngineResult<()>;
    /// Commits the point once the other shot is also selected.
    fn select_winning_shot(&mut self, shot: ShotRef)
    -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>>;
    /// Commits the point once the winning shot is also selected.
    fn select_other_shot(&mut self, shot: ShotRef) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>>;
    /// Clear the winning shot of the pending point.
    fn undo_winning_shot_selection(&mut self) -> EngineResult<()>;
    /// Clear the other shot of the pending point.
    fn undo_other_shot_selection(&mut self) -> EngineResult<()>;
    /// Re-run a commit that failed, skipping writes that already went through.
    fn retry_commit(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>>;
    /// Drop the pending point, rolling back a set score already written for it.
    fn cancel_point_entry(&mut self) -> BoxFuture<'_, EngineResult<()>>;

    /// Take back the most recent logged point.
    fn undo_last_point(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>>;
    /// Open the next set without finishing the current one.
    fn advance_to_next_set(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>>;
    /// Rebuild set bookkeeping from the store after a conflict.
    fn reconcile(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>>;
    /// Replace the match notes.
    fn update_notes(&mut self, notes: String) -> BoxFuture<'_, EngineResult<()>>;
}
