//! Live match tracker: point entry, commit, undo and set progression for one match.
//!
//! Every mutating operation works on a draft copy of the match progress and only
//! swaps it in once all of its gateway calls have succeeded. When a call fails
//! half-way, the server-side steps that already went through are remembered in a
//! checkpoint so a retry picks up after them instead of repeating them.

use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            MatchEntity, MatchPatch, NewMatchEntity, NewPointEntity, NewSetEntity, PointEntity,
            SetEntity, SetPatch, ShotRef, Side,
        },
        score_gateway::ScoreGateway,
        storage::{RejectionKind, StorageError, StorageResult},
    },
    scoring::{
        ScoringEngine,
        error::{EngineError, EngineResult, InvalidState},
        events::ScoringEvent,
        rules::{MatchFormat, SetScore, SetTally, server_for},
    },
};

/// Where the point-entry flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryPhase {
    /// No point entry in progress.
    Idle,
    /// Only the rally winner is known.
    WinnerSelected,
    /// Winner and winning shot are known.
    WinningShotSelected,
    /// Winner and other shot are known.
    OtherShotSelected,
    /// Both shots are chosen; the commit is running or waiting for a retry.
    Committing,
}

/// A committed point, as remembered for undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LoggedPoint {
    /// Stored point identifier.
    pub point_id: Uuid,
    /// Stored set the point belongs to.
    pub set_id: Uuid,
    /// Number of that set within the match.
    pub set_number: u32,
    /// 1-based position of the point in its set.
    pub point_number: u32,
    /// Side that won the rally.
    pub winner: Side,
}

/// Read-only view of one set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetView {
    /// 1-based set number.
    pub set_number: u32,
    /// `None` while the set is not stored yet.
    pub set_id: Option<Uuid>,
    /// Points of both sides.
    pub score: SetScore,
    /// Whether the set has a winner.
    pub complete: bool,
}

/// Read-only view of the whole tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub match_id: Uuid,
    pub opponent_name: String,
    pub date: SystemTime,
    pub notes: String,
    pub initial_server: Side,
    pub best_of: u8,
    pub match_score: String,
    pub match_complete: bool,
    pub current_set_number: u32,
    pub current_set_id: Option<Uuid>,
    pub current_server: Side,
    pub sets: Vec<SetView>,
    pub point_log: Vec<LoggedPoint>,
    pub phase: EntryPhase,
    pub selected_winner: Option<Side>,
    pub pending_winning_shot: Option<ShotRef>,
    pub pending_other_shot: Option<ShotRef>,
    pub can_undo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SetSlot {
    /// `None` until the set has been created on (or looked up from) the store.
    id: Option<Uuid>,
    score: SetScore,
}

impl SetSlot {
    fn unresolved() -> Self {
        Self {
            id: None,
            score: SetScore::default(),
        }
    }

    fn stored(set: &SetEntity) -> Self {
        Self {
            id: Some(set.id),
            score: SetScore::new(set.player_score, set.opponent_score),
        }
    }
}

/// Committed match progress. Cloned into a draft by every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Progress {
    /// Keyed and ordered by set number.
    sets: IndexMap<u32, SetSlot>,
    current_set_number: u32,
    point_log: Vec<LoggedPoint>,
    match_score: String,
    match_complete: bool,
}

impl Progress {
    fn fresh() -> Self {
        Self {
            sets: IndexMap::from([(1, SetSlot::unresolved())]),
            current_set_number: 1,
            point_log: Vec::new(),
            match_score: SetTally::default().to_string(),
            match_complete: false,
        }
    }

    /// Rebuild progress from the sets the store holds for a match.
    fn from_sets(sets: Vec<SetEntity>, format: MatchFormat) -> Self {
        let mut progress = Self::fresh();
        if !sets.is_empty() {
            progress.sets = sets
                .iter()
                .map(|set| (set.set_number, SetSlot::stored(set)))
                .collect();
            progress.sets.sort_keys();
        }
        progress.current_set_number = progress.sets.last().map(|(number, _)| *number).unwrap_or(1);

        let tally = progress.closed_tally();
        progress.match_score = tally.to_string();
        progress.match_complete =
            progress.current_score().is_complete() && format.winner(tally).is_some();
        progress
    }

    fn current(&self) -> EngineResult<&SetSlot> {
        self.sets
            .get(&self.current_set_number)
            .ok_or_else(|| missing_set(self.current_set_number))
    }

    fn current_mut(&mut self) -> EngineResult<&mut SetSlot> {
        let number = self.current_set_number;
        self.sets.get_mut(&number).ok_or_else(|| missing_set(number))
    }

    fn current_score(&self) -> SetScore {
        self.sets
            .get(&self.current_set_number)
            .map(|slot| slot.score)
            .unwrap_or_default()
    }

    /// Sets before the current one are closed; the current one only once it is complete.
    fn closed_tally(&self) -> SetTally {
        SetTally::from_closed(
            self.sets
                .iter()
                .filter(|(number, slot)| {
                    **number < self.current_set_number || slot.score.is_complete()
                })
                .map(|(_, slot)| &slot.score),
        )
    }

    fn set_number_of(&self, set_id: Uuid) -> Option<u32> {
        self.sets
            .iter()
            .find(|(_, slot)| slot.id == Some(set_id))
            .map(|(number, _)| *number)
    }
}

fn missing_set(set_number: u32) -> EngineError {
    EngineError::ReconciliationConflict(format!("set {set_number} is missing from local state"))
}

/// Deleting something that is already gone counts as success.
fn ignore_missing(result: StorageResult<()>) -> StorageResult<()> {
    match result {
        Err(StorageError::Rejected {
            kind: RejectionKind::NotFound,
            ..
        }) => Ok(()),
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PointEntry {
    winner: Side,
    winning_shot: Option<ShotRef>,
    other_shot: Option<ShotRef>,
}

#[derive(Debug, Clone, Copy)]
enum ShotSlot {
    Winning,
    Other,
}

/// Server-side progress of a commit that failed part-way.
#[derive(Debug, Clone, Default)]
struct CommitCheckpoint {
    set_id: Option<Uuid>,
    set_synced: bool,
    point: Option<PointEntity>,
    match_synced: bool,
}

/// Server-side progress of an undo that failed part-way.
#[derive(Debug, Clone, Default)]
struct UndoCheckpoint {
    point_deleted: bool,
    set_removed: bool,
    set_synced: bool,
    match_synced: bool,
}

/// Scoring engine for a single match, synchronised through a [`ScoreGateway`].
pub struct MatchTracker {
    gateway: Arc<dyn ScoreGateway>,
    match_id: Uuid,
    opponent_name: String,
    date: SystemTime,
    notes: String,
    initial_server: Side,
    format: MatchFormat,
    progress: Progress,
    entry: Option<PointEntry>,
    commit: Option<CommitCheckpoint>,
    undo: Option<UndoCheckpoint>,
}

impl MatchTracker {
    /// Create a match on the store together with its first set.
    ///
    /// If the first set cannot be created the match still starts; the set is
    /// looked up or created again when the first point is committed.
    pub async fn start(
        gateway: Arc<dyn ScoreGateway>,
        new_match: NewMatchEntity,
    ) -> EngineResult<Self> {
        let entity = gateway.create_match(new_match).await?;
        let mut tracker = Self::from_entity(gateway, entity);

        match tracker.open_set(1).await {
            Ok(set) => {
                tracker.progress.sets.insert(1, SetSlot::stored(&set));
            }
            Err(err) => warn!(
                match_id = %tracker.match_id,
                error = %err,
                "failed to create first set; deferring to first point"
            ),
        }

        info!(
            match_id = %tracker.match_id,
            opponent = %tracker.opponent_name,
            best_of = tracker.format.best_of(),
            "match started"
        );
        Ok(tracker)
    }

    /// Late join: rebuild the tracker for an existing match from the store.
    ///
    /// The point log starts empty, so points played before the resume cannot be undone.
    pub async fn resume(gateway: Arc<dyn ScoreGateway>, match_id: Uuid) -> EngineResult<Self> {
        let entity = gateway.find_match(match_id).await?.ok_or_else(|| {
            StorageError::rejected(
                RejectionKind::NotFound,
                format!("match `{match_id}` not found"),
            )
        })?;
        let mut tracker = Self::from_entity(gateway, entity);

        let sets = tracker.gateway.list_sets_by_match(match_id).await?;
        tracker.progress = Progress::from_sets(sets, tracker.format);

        info!(
            match_id = %match_id,
            current_set = tracker.progress.current_set_number,
            match_score = %tracker.progress.match_score,
            "match resumed"
        );
        Ok(tracker)
    }

    fn from_entity(gateway: Arc<dyn ScoreGateway>, entity: MatchEntity) -> Self {
        let format = MatchFormat::new(entity.best_of).unwrap_or_else(|| {
            warn!(
                match_id = %entity.id,
                best_of = entity.best_of,
                "stored match length is not a valid best-of; using default"
            );
            MatchFormat::default()
        });

        Self {
            gateway,
            match_id: entity.id,
            opponent_name: entity.opponent_name,
            date: entity.date,
            notes: entity.notes,
            initial_server: entity.initial_server,
            format,
            progress: Progress::fresh(),
            entry: None,
            commit: None,
            undo: None,
        }
    }

    fn phase(&self) -> EntryPhase {
        match &self.entry {
            None => EntryPhase::Idle,
            Some(entry) => match (&entry.winning_shot, &entry.other_shot) {
                (None, None) => EntryPhase::WinnerSelected,
                (Some(_), None) => EntryPhase::WinningShotSelected,
                (None, Some(_)) => EntryPhase::OtherShotSelected,
                (Some(_), Some(_)) => EntryPhase::Committing,
            },
        }
    }

    fn point_already_stored(&self) -> bool {
        self.commit
            .as_ref()
            .is_some_and(|checkpoint| checkpoint.point.is_some())
    }

    /// A commit or undo failed after the store accepted some of its writes.
    fn write_pending(&self) -> bool {
        self.commit.is_some() || self.undo.is_some()
    }

    fn begin_entry(&mut self, side: Side) -> EngineResult<()> {
        if self.progress.match_complete {
            return Err(InvalidState::MatchComplete.into());
        }
        if self.undo.is_some() {
            return Err(InvalidState::UndoPending.into());
        }
        if self.entry.is_some() {
            return Err(InvalidState::EntryInProgress.into());
        }

        self.entry = Some(PointEntry {
            winner: side,
            winning_shot: None,
            other_shot: None,
        });
        debug!(match_id = %self.match_id, winner = ?side, "point winner selected");
        Ok(())
    }

    async fn choose_shot(
        &mut self,
        slot: ShotSlot,
        shot: ShotRef,
    ) -> EngineResult<Vec<ScoringEvent>> {
        let point_stored = self.point_already_stored();
        let entry = self.entry.as_mut().ok_or(InvalidState::NoWinnerSelected)?;
        if point_stored {
            return Err(InvalidState::PointAlreadyRecorded.into());
        }

        match slot {
            ShotSlot::Winning => entry.winning_shot = Some(shot),
            ShotSlot::Other => entry.other_shot = Some(shot),
        }

        let ready = entry.winning_shot.is_some() && entry.other_shot.is_some();
        if ready {
            self.commit_point().await
        } else {
            Ok(Vec::new())
        }
    }

    fn clear_shot(&mut self, slot: ShotSlot) -> EngineResult<()> {
        let point_stored = self.point_already_stored();
        let entry = self.entry.as_mut().ok_or(InvalidState::NoWinnerSelected)?;
        if point_stored {
            return Err(InvalidState::PointAlreadyRecorded.into());
        }

        match slot {
            ShotSlot::Winning => entry.winning_shot = None,
            ShotSlot::Other => entry.other_shot = None,
        }
        Ok(())
    }

    async fn commit_point(&mut self) -> EngineResult<Vec<ScoringEvent>> {
        let entry = self.entry.clone().ok_or(InvalidState::NoWinnerSelected)?;
        let (Some(winning_shot), Some(other_shot)) = (entry.winning_shot, entry.other_shot) else {
            return Err(InvalidState::ShotsMissing.into());
        };

        let mut draft = self.progress.clone();
        let mut checkpoint = self.commit.take().unwrap_or_default();

        match self
            .apply_point(
                &mut draft,
                &mut checkpoint,
                entry.winner,
                winning_shot,
                other_shot,
            )
            .await
        {
            Ok(events) => {
                self.progress = draft;
                self.entry = None;
                Ok(events)
            }
            Err(err) => {
                warn!(
                    match_id = %self.match_id,
                    set_number = self.progress.current_set_number,
                    error = %err,
                    "point commit failed; selections kept for retry"
                );
                self.commit = Some(checkpoint);
                Err(err)
            }
        }
    }

    async fn apply_point(
        &self,
        draft: &mut Progress,
        checkpoint: &mut CommitCheckpoint,
        winner: Side,
        winning_shot: ShotRef,
        other_shot: ShotRef,
    ) -> EngineResult<Vec<ScoringEvent>> {
        let set_number = draft.current_set_number;
        let before = draft.current()?.score;
        let after = before.increment(winner);
        let point_number = before.total() + 1;

        let set_id = match checkpoint.set_id.or(draft.current()?.id) {
            Some(id) => id,
            None => self.resolve_set_id(set_number).await?,
        };
        checkpoint.set_id = Some(set_id);

        if !checkpoint.set_synced {
            self.gateway
                .update_set(set_id, SetPatch::from_scores(after.player, after.opponent))
                .await?;
            checkpoint.set_synced = true;
        }
        let slot = draft.current_mut()?;
        slot.id = Some(set_id);
        slot.score = after;

        let point = match checkpoint.point.clone() {
            Some(point) => point,
            None => {
                let point = self
                    .gateway
                    .create_point(NewPointEntity {
                        set_id,
                        point_number,
                        winner,
                        winning_shot,
                        other_shot,
                    })
                    .await?;
                checkpoint.point = Some(point.clone());
                point
            }
        };
        debug!(
            match_id = %self.match_id,
            set_number,
            point_number,
            score = %after,
            "point recorded"
        );

        draft.point_log.push(LoggedPoint {
            point_id: point.id,
            set_id,
            set_number,
            point_number,
            winner,
        });
        let mut events = vec![ScoringEvent::PointRecorded {
            point_id: point.id,
            set_number,
            point_number,
            winner,
            player_score: after.player,
            opponent_score: after.opponent,
        }];

        let Some(set_winner) = after.winner() else {
            return Ok(events);
        };

        let tally = draft.closed_tally();
        let match_score = tally.to_string();
        if !checkpoint.match_synced {
            self.sync_match_score(&match_score).await?;
            checkpoint.match_synced = true;
        }
        draft.match_score = match_score.clone();
        events.push(ScoringEvent::SetCompleted {
            set_number,
            winner: set_winner,
            player_score: after.player,
            opponent_score: after.opponent,
            match_score: match_score.clone(),
        });
        info!(match_id = %self.match_id, set_number, %match_score, "set completed");

        match self.format.winner(tally) {
            Some(match_winner) => {
                draft.match_complete = true;
                events.push(ScoringEvent::MatchCompleted {
                    winner: match_winner,
                    match_score,
                });
                info!(match_id = %self.match_id, winner = ?match_winner, "match completed");
            }
            None => {
                let next = self.open_set(set_number + 1).await?;
                draft.sets.insert(next.set_number, SetSlot::stored(&next));
                draft.current_set_number = next.set_number;
                events.push(ScoringEvent::SetStarted {
                    set_number: next.set_number,
                });
            }
        }

        Ok(events)
    }

    /// Find the stored id of a set by number, creating the set when the store has none.
    async fn resolve_set_id(&self, set_number: u32) -> EngineResult<Uuid> {
        let sets = self.gateway.list_sets_by_match(self.match_id).await?;
        if let Some(set) = sets.iter().find(|set| set.set_number == set_number) {
            debug!(match_id = %self.match_id, set_number, "reusing stored set");
            return Ok(set.id);
        }
        Ok(self.open_set(set_number).await?.id)
    }

    async fn open_set(&self, set_number: u32) -> EngineResult<SetEntity> {
        self.gateway
            .create_set(NewSetEntity::empty(self.match_id, set_number))
            .await
            .map_err(|err| {
                if err.is_conflict() {
                    EngineError::ReconciliationConflict(format!(
                        "set {set_number} already exists for match `{}`",
                        self.match_id
                    ))
                } else {
                    err.into()
                }
            })
    }

    async fn sync_match_score(&self, match_score: &str) -> EngineResult<()> {
        self.gateway
            .update_match(
                self.match_id,
                MatchPatch {
                    match_score: Some(match_score.to_string()),
                    ..MatchPatch::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn retry(&mut self) -> EngineResult<Vec<ScoringEvent>> {
        if self.entry.is_none() {
            return Err(InvalidState::NoWinnerSelected.into());
        }
        self.commit_point().await
    }

    async fn cancel_entry(&mut self) -> EngineResult<()> {
        if self.entry.is_none() {
            return Err(InvalidState::NoWinnerSelected.into());
        }
        if self.point_already_stored() {
            return Err(InvalidState::PointAlreadyRecorded.into());
        }

        // The stored set may already carry the abandoned point's score.
        let speculative_set = self
            .commit
            .as_ref()
            .filter(|checkpoint| checkpoint.set_synced)
            .and_then(|checkpoint| checkpoint.set_id);
        if let Some(set_id) = speculative_set {
            let score = self.progress.current()?.score;
            self.gateway
                .update_set(set_id, SetPatch::from_scores(score.player, score.opponent))
                .await?;
        }

        self.entry = None;
        self.commit = None;
        debug!(match_id = %self.match_id, "point entry cancelled");
        Ok(())
    }

    async fn undo_point(&mut self) -> EngineResult<Vec<ScoringEvent>> {
        if self.entry.is_some() {
            return Err(InvalidState::EntryInProgress.into());
        }
        let point = self
            .progress
            .point_log
            .last()
            .cloned()
            .ok_or(InvalidState::NothingToUndo)?;

        let mut draft = self.progress.clone();
        let mut checkpoint = self.undo.take().unwrap_or_default();

        match self.revert_point(&mut draft, &mut checkpoint, &point).await {
            Ok(events) => {
                self.progress = draft;
                info!(
                    match_id = %self.match_id,
                    point_id = %point.point_id,
                    set_number = self.progress.current_set_number,
                    "point undone"
                );
                Ok(events)
            }
            Err(err) => {
                warn!(
                    match_id = %self.match_id,
                    point_id = %point.point_id,
                    error = %err,
                    "undo failed; point log unchanged"
                );
                self.undo = Some(checkpoint);
                Err(err)
            }
        }
    }

    async fn revert_point(
        &self,
        draft: &mut Progress,
        checkpoint: &mut UndoCheckpoint,
        point: &LoggedPoint,
    ) -> EngineResult<Vec<ScoringEvent>> {
        // Located through the point's own set reference, never by log position.
        let owning_number = draft.set_number_of(point.set_id).ok_or_else(|| {
            EngineError::ReconciliationConflict(format!(
                "set `{}` of point `{}` is not tracked locally",
                point.set_id, point.point_id
            ))
        })?;
        let owning_score = draft
            .sets
            .get(&owning_number)
            .map(|slot| slot.score)
            .ok_or_else(|| missing_set(owning_number))?;
        let reverted = owning_score.decrement(point.winner).ok_or_else(|| {
            EngineError::ReconciliationConflict(format!(
                "set {owning_number} holds no point for {:?} to take back",
                point.winner
            ))
        })?;

        if !checkpoint.point_deleted {
            ignore_missing(self.gateway.delete_point(point.point_id).await)?;
            checkpoint.point_deleted = true;
        }

        let mut events = vec![ScoringEvent::PointUndone {
            point_id: point.point_id,
            set_number: owning_number,
            player_score: reverted.player,
            opponent_score: reverted.opponent,
        }];

        let trailing_number = draft.current_set_number;
        let trailing = draft.current()?;
        if owning_number + 1 == trailing_number && trailing.score.total() == 0 {
            if !checkpoint.set_removed {
                if let Some(trailing_id) = trailing.id {
                    ignore_missing(self.gateway.delete_set(trailing_id).await)?;
                }
                checkpoint.set_removed = true;
            }
            draft.sets.shift_remove(&trailing_number);
            draft.current_set_number = owning_number;
            events.push(ScoringEvent::SetRemoved {
                set_number: trailing_number,
            });
        }

        if !checkpoint.set_synced {
            self.gateway
                .update_set(
                    point.set_id,
                    SetPatch::from_scores(reverted.player, reverted.opponent),
                )
                .await?;
            checkpoint.set_synced = true;
        }
        if let Some(slot) = draft.sets.get_mut(&owning_number) {
            slot.score = reverted;
        }
        draft.point_log.pop();

        let tally = draft.closed_tally();
        let match_score = tally.to_string();
        if match_score != draft.match_score {
            if !checkpoint.match_synced {
                self.sync_match_score(&match_score).await?;
                checkpoint.match_synced = true;
            }
            draft.match_score = match_score.clone();
        }
        if draft.match_complete && self.format.winner(tally).is_none() {
            draft.match_complete = false;
            events.push(ScoringEvent::MatchReopened { match_score });
        }

        Ok(events)
    }

    async fn advance_set(&mut self) -> EngineResult<Vec<ScoringEvent>> {
        if self.progress.match_complete {
            return Err(InvalidState::MatchComplete.into());
        }
        if self.undo.is_some() {
            return Err(InvalidState::UndoPending.into());
        }
        if self.entry.is_some() {
            return Err(InvalidState::EntryInProgress.into());
        }

        let next = self.open_set(self.progress.current_set_number + 1).await?;
        self.progress
            .sets
            .insert(next.set_number, SetSlot::stored(&next));
        self.progress.current_set_number = next.set_number;

        info!(match_id = %self.match_id, set_number = next.set_number, "set advanced manually");
        Ok(vec![ScoringEvent::SetStarted {
            set_number: next.set_number,
        }])
    }

    /// Rebuild set bookkeeping from the store, folding in any half-finished commit or undo.
    ///
    /// Writes the store accepted for an abandoned commit are rolled back and a
    /// started undo is finished first, so every adopted set score matches the
    /// points stored against it.
    async fn resync(&mut self) -> EngineResult<Vec<ScoringEvent>> {
        let had_pending = self.write_pending();
        let mut events = Vec::new();

        if self
            .undo
            .as_ref()
            .is_some_and(|checkpoint| checkpoint.point_deleted)
        {
            events.extend(self.undo_point().await?);
        }
        self.undo = None;

        let stored_point = self
            .commit
            .as_ref()
            .and_then(|checkpoint| checkpoint.point.clone());
        let speculative_set = self
            .commit
            .as_ref()
            .filter(|checkpoint| checkpoint.set_synced && checkpoint.point.is_none())
            .and_then(|checkpoint| checkpoint.set_id);
        if let Some(set_id) = speculative_set {
            let score = self.progress.current()?.score;
            self.gateway
                .update_set(set_id, SetPatch::from_scores(score.player, score.opponent))
                .await?;
            debug!(match_id = %self.match_id, %score, "rolled back score of abandoned point");
        }

        let sets = self.gateway.list_sets_by_match(self.match_id).await?;
        let mut progress = Progress::from_sets(sets, self.format);

        let mut log = self.progress.point_log.clone();
        if let Some(point) = stored_point {
            log.push(LoggedPoint {
                point_id: point.id,
                set_id: point.set_id,
                set_number: 0,
                point_number: point.point_number,
                winner: point.winner,
            });
        }
        log.retain_mut(|logged| match progress.set_number_of(logged.set_id) {
            Some(number) => {
                logged.set_number = number;
                true
            }
            None => false,
        });
        progress.point_log = log;

        // A commit that stopped after closing a set may not have opened the next one.
        if progress.current_score().is_complete() && !progress.match_complete {
            let next = self.open_set(progress.current_set_number + 1).await?;
            progress.sets.insert(next.set_number, SetSlot::stored(&next));
            progress.current_set_number = next.set_number;
        }
        if had_pending {
            self.sync_match_score(&progress.match_score).await?;
        }

        if progress.match_score != self.progress.match_score {
            debug!(
                match_id = %self.match_id,
                local = %self.progress.match_score,
                stored = %progress.match_score,
                "match score changed after reconciliation"
            );
        }

        self.progress = progress;
        self.entry = None;
        self.commit = None;

        info!(
            match_id = %self.match_id,
            current_set = self.progress.current_set_number,
            "state reconciled with store"
        );
        events.push(ScoringEvent::StateReconciled {
            current_set_number: self.progress.current_set_number,
            match_score: self.progress.match_score.clone(),
        });
        Ok(events)
    }

    async fn save_notes(&mut self, notes: String) -> EngineResult<()> {
        self.gateway
            .update_match(
                self.match_id,
                MatchPatch {
                    notes: Some(notes.clone()),
                    ..MatchPatch::default()
                },
            )
            .await?;
        self.notes = notes;
        Ok(())
    }
}

impl ScoringEngine for MatchTracker {
    fn match_id(&self) -> Uuid {
        self.match_id
    }

    fn snapshot(&self) -> TrackerSnapshot {
        let entry = self.entry.as_ref();
        TrackerSnapshot {
            match_id: self.match_id,
            opponent_name: self.opponent_name.clone(),
            date: self.date,
            notes: self.notes.clone(),
            initial_server: self.initial_server,
            best_of: self.format.best_of(),
            match_score: self.progress.match_score.clone(),
            match_complete: self.progress.match_complete,
            current_set_number: self.progress.current_set_number,
            current_set_id: self
                .progress
                .sets
                .get(&self.progress.current_set_number)
                .and_then(|slot| slot.id),
            current_server: self.current_server(),
            sets: self
                .progress
                .sets
                .iter()
                .map(|(number, slot)| SetView {
                    set_number: *number,
                    set_id: slot.id,
                    score: slot.score,
                    complete: slot.score.is_complete(),
                })
                .collect(),
            point_log: self.progress.point_log.clone(),
            phase: self.phase(),
            selected_winner: entry.map(|entry| entry.winner),
            pending_winning_shot: entry.and_then(|entry| entry.winning_shot.clone()),
            pending_other_shot: entry.and_then(|entry| entry.other_shot.clone()),
            can_undo: self.entry.is_none() && !self.progress.point_log.is_empty(),
        }
    }

    fn current_server(&self) -> Side {
        server_for(
            self.initial_server,
            self.progress.current_set_number,
            self.progress.current_score(),
        )
    }

    fn total_points_in_current_set(&self) -> u32 {
        self.progress.current_score().total()
    }

    fn has_unfinished_write(&self) -> bool {
        self.write_pending()
    }

    fn select_point_winner(&mut self, side: Side) -> EngineResult<()> {
        self.begin_entry(side)
    }

    fn select_winning_shot(
        &mut self,
        shot: ShotRef,
    ) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>> {
        Box::pin(self.choose_shot(ShotSlot::Winning, shot))
    }

    fn select_other_shot(&mut self, shot: ShotRef) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>> {
        Box::pin(self.choose_shot(ShotSlot::Other, shot))
    }

    fn undo_winning_shot_selection(&mut self) -> EngineResult<()> {
        self.clear_shot(ShotSlot::Winning)
    }

    fn undo_other_shot_selection(&mut self) -> EngineResult<()> {
        self.clear_shot(ShotSlot::Other)
    }

    fn retry_commit(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>> {
        Box::pin(self.retry())
    }

    fn cancel_point_entry(&mut self) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(self.cancel_entry())
    }

    fn undo_last_point(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>> {
        Box::pin(self.undo_point())
    }

    fn advance_to_next_set(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>> {
        Box::pin(self.advance_set())
    }

    fn reconcile(&mut self) -> BoxFuture<'_, EngineResult<Vec<ScoringEvent>>> {
        Box::pin(self.resync())
    }

    fn update_notes(&mut self, notes: String) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(self.save_notes(notes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{
        models::Hand,
        score_gateway::in_memory::{GatewayOp, InMemoryScoreGateway, InjectedFailure},
    };

    fn shot(id: &str) -> ShotRef {
        ShotRef {
            shot_id: id.into(),
            hand: Hand::Forehand,
            lucky: false,
        }
    }

    async fn tracker(best_of: u8, initial_server: Side) -> (InMemoryScoreGateway, MatchTracker) {
        let gateway = InMemoryScoreGateway::new();
        let tracker = MatchTracker::start(
            Arc::new(gateway.clone()),
            NewMatchEntity {
                opponent_name: "Fan Zhendong".into(),
                date: SystemTime::now(),
                notes: String::new(),
                initial_server,
                best_of,
            },
        )
        .await
        .unwrap();
        (gateway, tracker)
    }

    async fn play(tracker: &mut MatchTracker, side: Side) -> EngineResult<Vec<ScoringEvent>> {
        tracker.select_point_winner(side)?;
        tracker.select_winning_shot(shot("loop")).await?;
        tracker.select_other_shot(shot("block")).await
    }

    async fn play_n(tracker: &mut MatchTracker, side: Side, count: usize) {
        for _ in 0..count {
            play(tracker, side).await.unwrap();
        }
    }

    async fn win_set(tracker: &mut MatchTracker, side: Side) {
        play_n(tracker, side, 11).await;
    }

    #[tokio::test]
    async fn set_scores_match_stored_points() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        for side in [Side::Player, Side::Opponent, Side::Opponent, Side::Player] {
            play(&mut tracker, side).await.unwrap();
        }
        play_n(&mut tracker, Side::Opponent, 9).await;
        play_n(&mut tracker, Side::Player, 3).await;

        for set in gateway.sets_of(tracker.match_id()) {
            let points = gateway.points_of(set.id).len() as u32;
            assert_eq!(set.player_score + set.opponent_score, points);
        }
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.current_set_number, 2);
        assert_eq!(tracker.total_points_in_current_set(), 3);
        assert_eq!(snapshot.sets[0].score, SetScore::new(2, 11));
    }

    #[tokio::test]
    async fn shot_selection_requires_a_winner() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        let before = tracker.snapshot();

        let first = tracker.select_winning_shot(shot("smash")).await;
        let second = tracker.select_other_shot(shot("lob")).await;

        assert!(matches!(
            first,
            Err(EngineError::InvalidState(InvalidState::NoWinnerSelected))
        ));
        assert!(matches!(
            second,
            Err(EngineError::InvalidState(InvalidState::NoWinnerSelected))
        ));
        assert_eq!(tracker.snapshot(), before);
        assert_eq!(gateway.calls(GatewayOp::CreatePoint), 0);
    }

    #[tokio::test]
    async fn point_entry_walks_through_phases() {
        let (_gateway, mut tracker) = tracker(5, Side::Player).await;
        assert_eq!(tracker.snapshot().phase, EntryPhase::Idle);

        tracker.select_point_winner(Side::Opponent).unwrap();
        assert_eq!(tracker.snapshot().phase, EntryPhase::WinnerSelected);
        assert!(matches!(
            tracker.select_point_winner(Side::Player),
            Err(EngineError::InvalidState(InvalidState::EntryInProgress))
        ));

        tracker.select_other_shot(shot("push")).await.unwrap();
        assert_eq!(tracker.snapshot().phase, EntryPhase::OtherShotSelected);
        tracker.undo_other_shot_selection().unwrap();
        assert_eq!(tracker.snapshot().phase, EntryPhase::WinnerSelected);

        tracker.select_winning_shot(shot("flick")).await.unwrap();
        assert_eq!(tracker.snapshot().phase, EntryPhase::WinningShotSelected);
        let events = tracker.select_other_shot(shot("push")).await.unwrap();

        assert_eq!(tracker.snapshot().phase, EntryPhase::Idle);
        assert!(matches!(
            events.as_slice(),
            [ScoringEvent::PointRecorded {
                point_number: 1,
                winner: Side::Opponent,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn best_of_one_ends_after_eleven_nil() {
        let (gateway, mut tracker) = tracker(1, Side::Player).await;
        play_n(&mut tracker, Side::Player, 10).await;
        let events = play(&mut tracker, Side::Player).await.unwrap();

        assert!(events.iter().any(|event| matches!(
            event,
            ScoringEvent::SetCompleted {
                set_number: 1,
                winner: Side::Player,
                ..
            }
        )));
        assert!(events.iter().any(|event| matches!(
            event,
            ScoringEvent::MatchCompleted {
                winner: Side::Player,
                ..
            }
        )));

        let snapshot = tracker.snapshot();
        assert!(snapshot.match_complete);
        assert!(snapshot.sets[0].complete);
        assert_eq!(snapshot.match_score, "1-0");
        assert_eq!(gateway.sets_of(tracker.match_id()).len(), 1);
        assert_eq!(
            gateway.match_of(tracker.match_id()).unwrap().match_score,
            "1-0"
        );
        assert!(matches!(
            tracker.select_point_winner(Side::Player),
            Err(EngineError::InvalidState(InvalidState::MatchComplete))
        ));
    }

    #[tokio::test]
    async fn three_nil_completes_best_of_five() {
        let (gateway, mut tracker) = tracker(5, Side::Opponent).await;
        for _ in 0..3 {
            win_set(&mut tracker, Side::Player).await;
        }

        let snapshot = tracker.snapshot();
        assert!(snapshot.match_complete);
        assert_eq!(snapshot.match_score, "3-0");
        assert_eq!(snapshot.current_set_number, 3);
        assert_eq!(gateway.sets_of(tracker.match_id()).len(), 3);
    }

    #[tokio::test]
    async fn two_one_lead_opens_fourth_set() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        win_set(&mut tracker, Side::Player).await;
        win_set(&mut tracker, Side::Opponent).await;
        win_set(&mut tracker, Side::Player).await;

        let snapshot = tracker.snapshot();
        assert!(!snapshot.match_complete);
        assert_eq!(snapshot.match_score, "2-1");
        assert_eq!(snapshot.current_set_number, 4);

        let sets = gateway.sets_of(tracker.match_id());
        assert_eq!(sets.len(), 4);
        assert_eq!((sets[3].player_score, sets[3].opponent_score), (0, 0));
    }

    #[tokio::test]
    async fn serve_follows_points_played() {
        let (_gateway, mut tracker) = tracker(5, Side::Player).await;
        assert_eq!(tracker.current_server(), Side::Player);
        play(&mut tracker, Side::Player).await.unwrap();
        assert_eq!(tracker.current_server(), Side::Player);
        play(&mut tracker, Side::Opponent).await.unwrap();
        assert_eq!(tracker.current_server(), Side::Opponent);
        assert_eq!(tracker.current_server(), tracker.current_server());

        play_n(&mut tracker, Side::Player, 10).await;
        assert_eq!(tracker.snapshot().current_set_number, 2);
        assert_eq!(tracker.current_server(), Side::Opponent);
    }

    #[tokio::test]
    async fn commit_then_undo_restores_state() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Opponent, 4).await;
        let before = tracker.snapshot();

        play(&mut tracker, Side::Player).await.unwrap();
        let events = tracker.undo_last_point().await.unwrap();

        assert_eq!(tracker.snapshot(), before);
        assert!(matches!(
            events.as_slice(),
            [ScoringEvent::PointUndone {
                player_score: 0,
                opponent_score: 4,
                ..
            }]
        ));
        let set_id = before.current_set_id.unwrap();
        assert_eq!(gateway.points_of(set_id).len(), 4);
    }

    #[tokio::test]
    async fn undo_across_set_boundary_drops_trailing_set() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 10).await;
        play_n(&mut tracker, Side::Opponent, 3).await;
        let before = tracker.snapshot();

        play(&mut tracker, Side::Player).await.unwrap();
        assert_eq!(tracker.snapshot().current_set_number, 2);
        assert_eq!(tracker.snapshot().match_score, "1-0");

        let events = tracker.undo_last_point().await.unwrap();
        assert!(events.contains(&ScoringEvent::SetRemoved { set_number: 2 }));
        assert_eq!(tracker.snapshot(), before);

        let sets = gateway.sets_of(tracker.match_id());
        assert_eq!(sets.len(), 1);
        assert_eq!((sets[0].player_score, sets[0].opponent_score), (10, 3));
        assert_eq!(
            gateway.match_of(tracker.match_id()).unwrap().match_score,
            "0-0"
        );
    }

    #[tokio::test]
    async fn undo_reopens_completed_match() {
        let (gateway, mut tracker) = tracker(1, Side::Player).await;
        win_set(&mut tracker, Side::Opponent).await;
        assert!(tracker.snapshot().match_complete);

        let events = tracker.undo_last_point().await.unwrap();

        assert!(events.contains(&ScoringEvent::MatchReopened {
            match_score: "0-0".into()
        }));
        let snapshot = tracker.snapshot();
        assert!(!snapshot.match_complete);
        assert_eq!(snapshot.sets[0].score, SetScore::new(0, 10));
        assert_eq!(
            gateway.match_of(tracker.match_id()).unwrap().match_score,
            "0-0"
        );
        play(&mut tracker, Side::Player).await.unwrap();
    }

    #[tokio::test]
    async fn undo_preconditions() {
        let (_gateway, mut tracker) = tracker(5, Side::Player).await;
        assert!(matches!(
            tracker.undo_last_point().await,
            Err(EngineError::InvalidState(InvalidState::NothingToUndo))
        ));

        play(&mut tracker, Side::Player).await.unwrap();
        tracker.select_point_winner(Side::Player).unwrap();
        assert!(matches!(
            tracker.undo_last_point().await,
            Err(EngineError::InvalidState(InvalidState::EntryInProgress))
        ));
        assert!(!tracker.snapshot().can_undo);
    }

    #[tokio::test]
    async fn failed_commit_keeps_selection_and_retry_does_not_repeat_writes() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        let before = tracker.snapshot();
        gateway.fail_next(GatewayOp::CreatePoint, InjectedFailure::Transport);

        let err = play(&mut tracker, Side::Opponent).await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));

        let failed = tracker.snapshot();
        assert_eq!(failed.phase, EntryPhase::Committing);
        assert_eq!(failed.selected_winner, Some(Side::Opponent));
        assert_eq!(failed.sets, before.sets);
        assert!(failed.point_log.is_empty());

        let events = tracker.retry_commit().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(gateway.calls(GatewayOp::UpdateSet), 1);

        let set_id = before.current_set_id.unwrap();
        assert_eq!(gateway.points_of(set_id).len(), 1);
        assert_eq!(tracker.snapshot().sets[0].score, SetScore::new(0, 1));
    }

    #[tokio::test]
    async fn failure_after_point_is_stored_does_not_duplicate_it() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 10).await;
        gateway.fail_next(GatewayOp::UpdateMatch, InjectedFailure::Transport);

        assert!(play(&mut tracker, Side::Player).await.is_err());
        assert!(matches!(
            tracker.select_winning_shot(shot("smash")).await,
            Err(EngineError::InvalidState(
                InvalidState::PointAlreadyRecorded
            ))
        ));
        assert!(matches!(
            tracker.cancel_point_entry().await,
            Err(EngineError::InvalidState(
                InvalidState::PointAlreadyRecorded
            ))
        ));

        tracker.retry_commit().await.unwrap();

        let sets = gateway.sets_of(tracker.match_id());
        assert_eq!(sets.len(), 2);
        assert_eq!(gateway.points_of(sets[0].id).len(), 11);
        assert_eq!(gateway.calls(GatewayOp::CreatePoint), 11);
        assert_eq!(tracker.snapshot().point_log.len(), 11);
    }

    #[tokio::test]
    async fn cancelling_after_partial_commit_restores_stored_set() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 2).await;
        gateway.fail_next(GatewayOp::CreatePoint, InjectedFailure::Transport);

        assert!(play(&mut tracker, Side::Player).await.is_err());
        let stored = gateway.sets_of(tracker.match_id());
        assert_eq!(stored[0].player_score, 3);

        tracker.cancel_point_entry().await.unwrap();

        let stored = gateway.sets_of(tracker.match_id());
        assert_eq!((stored[0].player_score, stored[0].score.as_str()), (2, "2-0"));
        assert_eq!(tracker.snapshot().phase, EntryPhase::Idle);
    }

    #[tokio::test]
    async fn failed_undo_keeps_log_and_can_be_retried() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 3).await;
        let before = tracker.snapshot();
        gateway.fail_next(GatewayOp::UpdateSet, InjectedFailure::Transport);

        assert!(tracker.undo_last_point().await.is_err());
        assert_eq!(tracker.snapshot(), before);
        assert!(matches!(
            tracker.select_point_winner(Side::Player),
            Err(EngineError::InvalidState(InvalidState::UndoPending))
        ));

        tracker.undo_last_point().await.unwrap();
        assert_eq!(gateway.calls(GatewayOp::DeletePoint), 1);
        assert_eq!(tracker.snapshot().point_log.len(), 2);
        assert_eq!(tracker.snapshot().sets[0].score, SetScore::new(2, 0));
    }

    #[tokio::test]
    async fn existing_next_set_surfaces_conflict_until_reconciled() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 10).await;
        gateway
            .create_set(NewSetEntity::empty(tracker.match_id(), 2))
            .await
            .unwrap();

        let err = play(&mut tracker, Side::Player).await.unwrap_err();
        assert!(matches!(err, EngineError::ReconciliationConflict(_)));
        assert_eq!(tracker.snapshot().current_set_number, 1);

        let events = tracker.reconcile().await.unwrap();
        assert!(matches!(
            events.as_slice(),
            [ScoringEvent::StateReconciled {
                current_set_number: 2,
                ..
            }]
        ));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.phase, EntryPhase::Idle);
        assert_eq!(snapshot.match_score, "1-0");
        assert_eq!(snapshot.point_log.len(), 11);
        assert_eq!(snapshot.sets[0].score, SetScore::new(11, 0));
        play(&mut tracker, Side::Opponent).await.unwrap();
    }

    #[tokio::test]
    async fn reconcile_rolls_back_score_of_point_never_stored() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 2).await;
        gateway.fail_next(GatewayOp::CreatePoint, InjectedFailure::Transport);
        assert!(play(&mut tracker, Side::Player).await.is_err());
        assert_eq!(gateway.sets_of(tracker.match_id())[0].player_score, 3);

        tracker.reconcile().await.unwrap();

        let snapshot = tracker.snapshot();
        let set = &gateway.sets_of(tracker.match_id())[0];
        assert_eq!(snapshot.sets[0].score, SetScore::new(2, 0));
        assert_eq!((set.player_score, set.opponent_score), (2, 0));
        assert_eq!(gateway.points_of(set.id).len(), 2);
        assert_eq!(snapshot.point_log.len(), 2);
        assert_eq!(snapshot.phase, EntryPhase::Idle);
        assert_eq!(tracker.current_server(), Side::Opponent);

        let events = play(&mut tracker, Side::Opponent).await.unwrap();
        assert!(matches!(
            events.as_slice(),
            [ScoringEvent::PointRecorded { point_number: 3, .. }]
        ));
    }

    #[tokio::test]
    async fn reconcile_finishes_undo_that_already_deleted_its_point() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 3).await;
        gateway.fail_next(GatewayOp::UpdateSet, InjectedFailure::Transport);
        assert!(tracker.undo_last_point().await.is_err());

        let events = tracker.reconcile().await.unwrap();

        assert!(matches!(
            events.as_slice(),
            [
                ScoringEvent::PointUndone { player_score: 2, .. },
                ScoringEvent::StateReconciled { .. }
            ]
        ));
        let snapshot = tracker.snapshot();
        let set = &gateway.sets_of(tracker.match_id())[0];
        assert_eq!(snapshot.sets[0].score, SetScore::new(2, 0));
        assert_eq!((set.player_score, set.opponent_score), (2, 0));
        assert_eq!(gateway.points_of(set.id).len(), 2);
        assert_eq!(snapshot.point_log.len(), 2);
        assert_eq!(gateway.calls(GatewayOp::DeletePoint), 1);
        play(&mut tracker, Side::Player).await.unwrap();
    }

    #[tokio::test]
    async fn reconcile_opens_next_set_after_interrupted_set_point() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Player, 10).await;
        gateway.fail_next(GatewayOp::UpdateMatch, InjectedFailure::Transport);
        assert!(play(&mut tracker, Side::Player).await.is_err());

        tracker.reconcile().await.unwrap();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.current_set_number, 2);
        assert_eq!(snapshot.match_score, "1-0");
        assert_eq!(snapshot.point_log.len(), 11);
        assert_eq!(gateway.sets_of(tracker.match_id()).len(), 2);
        assert_eq!(
            gateway.match_of(tracker.match_id()).unwrap().match_score,
            "1-0"
        );
        assert!(!tracker.has_unfinished_write());
    }

    #[tokio::test]
    async fn manual_advance_opens_empty_set() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Opponent, 5).await;
        play_n(&mut tracker, Side::Player, 3).await;

        let events = tracker.advance_to_next_set().await.unwrap();
        assert_eq!(events, vec![ScoringEvent::SetStarted { set_number: 2 }]);
        assert_eq!(tracker.total_points_in_current_set(), 0);
        assert_eq!(tracker.current_server(), Side::Opponent);
        assert_eq!(gateway.sets_of(tracker.match_id()).len(), 2);

        tracker.undo_last_point().await.unwrap();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.current_set_number, 1);
        assert_eq!(snapshot.sets.len(), 1);
        assert_eq!(snapshot.sets[0].score, SetScore::new(2, 5));
    }

    #[tokio::test]
    async fn first_set_is_resolved_on_first_point_when_start_could_not_create_it() {
        let gateway = InMemoryScoreGateway::new();
        gateway.fail_next(GatewayOp::CreateSet, InjectedFailure::Transport);
        let mut tracker = MatchTracker::start(
            Arc::new(gateway.clone()),
            NewMatchEntity {
                opponent_name: "Timo Boll".into(),
                date: SystemTime::now(),
                notes: String::new(),
                initial_server: Side::Opponent,
                best_of: 3,
            },
        )
        .await
        .unwrap();
        assert_eq!(tracker.snapshot().current_set_id, None);

        play(&mut tracker, Side::Player).await.unwrap();

        let sets = gateway.sets_of(tracker.match_id());
        assert_eq!(sets.len(), 1);
        assert_eq!(tracker.snapshot().current_set_id, Some(sets[0].id));
        assert_eq!(gateway.points_of(sets[0].id).len(), 1);
    }

    #[tokio::test]
    async fn resume_rebuilds_progress_from_store() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        play_n(&mut tracker, Side::Opponent, 3).await;
        win_set(&mut tracker, Side::Player).await;
        play_n(&mut tracker, Side::Opponent, 2).await;

        let resumed = MatchTracker::resume(Arc::new(gateway.clone()), tracker.match_id())
            .await
            .unwrap();
        let snapshot = resumed.snapshot();

        assert_eq!(snapshot.current_set_number, 2);
        assert_eq!(snapshot.match_score, "1-0");
        assert_eq!(snapshot.sets[1].score, SetScore::new(0, 2));
        assert!(!snapshot.can_undo);
        assert_eq!(resumed.current_server(), tracker.current_server());
    }

    #[tokio::test]
    async fn resume_unknown_match_is_a_persistence_failure() {
        let gateway = InMemoryScoreGateway::new();
        let result = MatchTracker::resume(Arc::new(gateway), Uuid::new_v4()).await;
        assert!(matches!(
            result,
            Err(EngineError::Persistence(StorageError::Rejected {
                kind: RejectionKind::NotFound,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn notes_are_stored() {
        let (gateway, mut tracker) = tracker(5, Side::Player).await;
        tracker.update_notes("serve long to backhand".into()).await.unwrap();
        assert_eq!(tracker.snapshot().notes, "serve long to backhand");
        assert_eq!(
            gateway.match_of(tracker.match_id()).unwrap().notes,
            "serve long to backhand"
        );
    }
}
