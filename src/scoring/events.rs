use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::Side;

/// Notifications produced by engine operations, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringEvent {
    PointRecorded {
        point_id: Uuid,
        set_number: u32,
        point_number: u32,
        winner: Side,
        player_score: u32,
        opponent_score: u32,
    },
    PointUndone {
        point_id: Uuid,
        set_number: u32,
        player_score: u32,
        opponent_score: u32,
    },
    SetCompleted {
        set_number: u32,
        winner: Side,
        player_score: u32,
        opponent_score: u32,
        match_score: String,
    },
    SetStarted {
        set_number: u32,
    },
    /// A trailing empty set was dropped by an undo.
    SetRemoved {
        set_number: u32,
    },
    MatchCompleted {
        winner: Side,
        match_score: String,
    },
    MatchReopened {
        match_score: String,
    },
    /// Local state was rebuilt from the store.
    StateReconciled {
        current_set_number: u32,
        match_score: String,
    },
}
