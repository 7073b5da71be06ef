use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{Hand, ShotRef, Side},
    dto::{
        format_system_time, parse_system_time,
        validation::{validate_best_of, validate_not_blank},
    },
    scoring::{EntryPhase, LoggedPoint, SetView, TrackerSnapshot},
};

/// Payload used to start tracking a new match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1, max = 120), custom(function = "validate_not_blank"))]
    pub opponent_name: String,
    /// RFC 3339 date of the match; defaults to now.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
    pub initial_server: Side,
    /// Odd number of sets; the configured default applies when omitted.
    #[serde(default)]
    #[validate(custom(function = "validate_best_of"))]
    pub best_of: Option<u8>,
}

impl CreateMatchRequest {
    /// Parsed match date, `Err` with the raw value when it is not RFC 3339.
    pub fn parsed_date(&self) -> Result<Option<std::time::SystemTime>, String> {
        match self.date.as_deref() {
            None => Ok(None),
            Some(raw) => parse_system_time(raw).map(Some).ok_or_else(|| raw.to_string()),
        }
    }
}

/// Replace the free-text notes of a match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateNotesRequest {
    #[validate(length(max = 2000))]
    pub notes: String,
}

/// First step of the point-entry flow.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectWinnerRequest {
    pub winner: Side,
}

/// Shot chosen for the winning or the other slot of the pending point.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ShotSelectionRequest {
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub shot_id: String,
    pub hand: Hand,
    #[serde(default)]
    pub lucky: bool,
}

impl From<ShotSelectionRequest> for ShotRef {
    fn from(value: ShotSelectionRequest) -> Self {
        Self {
            shot_id: value.shot_id,
            hand: value.hand,
            lucky: value.lucky,
        }
    }
}

/// Per-set line of the match state.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetSummary {
    pub set_number: u32,
    /// Absent while the set has not been stored yet.
    pub set_id: Option<Uuid>,
    pub player_score: u32,
    pub opponent_score: u32,
    pub score: String,
    pub complete: bool,
}

impl From<SetView> for SetSummary {
    fn from(view: SetView) -> Self {
        Self {
            set_number: view.set_number,
            set_id: view.set_id,
            player_score: view.score.player,
            opponent_score: view.score.opponent,
            score: view.score.to_string(),
            complete: view.complete,
        }
    }
}

/// Full view of a live match returned by every match endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchStateResponse {
    pub match_id: Uuid,
    pub opponent_name: String,
    pub date: String,
    pub notes: String,
    pub initial_server: Side,
    pub best_of: u8,
    /// Sets won by the player, a dash, and sets won by the opponent.
    pub match_score: String,
    pub match_complete: bool,
    pub current_set_number: u32,
    pub current_set_id: Option<Uuid>,
    pub current_server: Side,
    pub sets: Vec<SetSummary>,
    /// Points that can still be undone, oldest first.
    pub points: Vec<LoggedPoint>,
    pub phase: EntryPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_winner: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_winning_shot: Option<ShotRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_other_shot: Option<ShotRef>,
    pub can_undo: bool,
}

impl From<TrackerSnapshot> for MatchStateResponse {
    fn from(snapshot: TrackerSnapshot) -> Self {
        Self {
            match_id: snapshot.match_id,
            opponent_name: snapshot.opponent_name,
            date: format_system_time(snapshot.date),
            notes: snapshot.notes,
            initial_server: snapshot.initial_server,
            best_of: snapshot.best_of,
            match_score: snapshot.match_score,
            match_complete: snapshot.match_complete,
            current_set_number: snapshot.current_set_number,
            current_set_id: snapshot.current_set_id,
            current_server: snapshot.current_server,
            sets: snapshot.sets.into_iter().map(SetSummary::from).collect(),
            points: snapshot.point_log,
            phase: snapshot.phase,
            selected_winner: snapshot.selected_winner,
            pending_winning_shot: snapshot.pending_winning_shot,
            pending_other_shot: snapshot.pending_other_shot,
            can_undo: snapshot.can_undo,
        }
    }
}
