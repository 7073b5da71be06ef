use thiserror::Error;

use crate::dao::storage::StorageError;

/// Result alias for scoring engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Precondition that an engine operation found unmet. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidState {
    #[error("a point entry is already in progress")]
    EntryInProgress,
    #[error("no point winner has been selected")]
    NoWinnerSelected,
    #[error("both shots must be selected before the point can be committed")]
    ShotsMissing,
    #[error("the point is already stored; retry the commit instead of editing it")]
    PointAlreadyRecorded,
    #[error("the match is already complete")]
    MatchComplete,
    #[error("there is no point to undo")]
    NothingToUndo,
    #[error("an interrupted undo must be retried first")]
    UndoPending,
}

/// Typed outcome surfaced to the presentation layer when an operation fails.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation is not allowed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(#[from] InvalidState),
    /// A gateway call failed; local state was not advanced.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StorageError),
    /// Local set bookkeeping disagrees with the store; call `reconcile` before retrying.
    #[error("reconciliation conflict: {0}")]
    ReconciliationConflict(String),
}
