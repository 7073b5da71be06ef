use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Side of the table a point, set or serve is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum Side {
    /// The tracked player (the account owner).
    #[serde(rename = "self")]
    Player,
    /// The opponent named on the match.
    #[serde(rename = "opponent")]
    Opponent,
}

impl Side {
    /// The other side of the table.
    pub fn other(self) -> Self {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }
}

/// Hand used to play a shot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Forehand,
    Backhand,
}

/// Opaque reference to a catalog shot, qualified by hand and luck.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ShotRef {
    /// Identifier of the shot in the shot catalog.
    pub shot_id: String,
    /// Forehand or backhand.
    pub hand: Hand,
    /// Set when the point was won by a mishit (net or edge ball).
    #[serde(default)]
    pub lucky: bool,
}

/// Match header persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Display name of the opponent.
    pub opponent_name: String,
    /// Day the match was played.
    pub date: SystemTime,
    /// Running `"won-lost"` set tally.
    pub match_score: String,
    /// Free-text notes.
    pub notes: String,
    /// Who served first in set one.
    pub initial_server: Side,
    /// Number of sets the match is played over (odd).
    pub best_of: u8,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the match header was updated.
    pub updated_at: SystemTime,
}

/// Fields supplied when creating a match; the store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatchEntity {
    pub opponent_name: String,
    pub date: SystemTime,
    pub notes: String,
    pub initial_server: Side,
    pub best_of: u8,
}

/// Partial update of a match header. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPatch {
    pub match_score: Option<String>,
    pub notes: Option<String>,
}

/// One set of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetEntity {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Owning match.
    pub match_id: Uuid,
    /// 1-based position of the set inside the match.
    pub set_number: u32,
    pub player_score: u32,
    pub opponent_score: u32,
    /// Display score (`"player-opponent"`), kept in sync with the numeric scores.
    pub score: String,
}

/// Fields supplied when creating a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSetEntity {
    pub match_id: Uuid,
    pub set_number: u32,
    pub player_score: u32,
    pub opponent_score: u32,
}

impl NewSetEntity {
    /// A fresh 0-0 set.
    pub fn empty(match_id: Uuid, set_number: u32) -> Self {
        Self {
            match_id,
            set_number,
            player_score: 0,
            opponent_score: 0,
        }
    }
}

/// Absolute score update for a set. Writes are idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPatch {
    pub player_score: u32,
    pub opponent_score: u32,
    pub score: String,
}

impl SetPatch {
    /// Build a patch carrying both numeric scores and the matching display string.
    pub fn from_scores(player_score: u32, opponent_score: u32) -> Self {
        Self {
            player_score,
            opponent_score,
            score: display_score(player_score, opponent_score),
        }
    }
}

/// A single rally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointEntity {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Set the point was played in.
    pub set_id: Uuid,
    /// 1-based sequence number within the set.
    pub point_number: u32,
    pub winner: Side,
    /// How the winner won the point.
    pub winning_shot: ShotRef,
    /// What the loser was attempting.
    pub other_shot: ShotRef,
    pub created_at: SystemTime,
}

/// Fields supplied when recording a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPointEntity {
    pub set_id: Uuid,
    pub point_number: u32,
    pub winner: Side,
    pub winning_shot: ShotRef,
    pub other_shot: ShotRef,
}

/// Render a `"left-right"` score string.
pub fn display_score(left: u32, right: u32) -> String {
    format!("{left}-{right}")
}

impl NewMatchEntity {
    /// Materialise the entity a store persists for this request.
    pub fn into_entity(self, id: Uuid) -> MatchEntity {
        let now = SystemTime::now();
        MatchEntity {
            id,
            opponent_name: self.opponent_name,
            date: self.date,
            match_score: display_score(0, 0),
            notes: self.notes,
            initial_server: self.initial_server,
            best_of: self.best_of,
            created_at: now,
            updated_at: now,
        }
    }
}

impl NewSetEntity {
    /// Materialise the entity a store persists for this request.
    pub fn into_entity(self, id: Uuid) -> SetEntity {
        SetEntity {
            id,
            match_id: self.match_id,
            set_number: self.set_number,
            player_score: self.player_score,
            opponent_score: self.opponent_score,
            score: display_score(self.player_score, self.opponent_score),
        }
    }
}

impl NewPointEntity {
    /// Materialise the entity a store persists for this request.
    pub fn into_entity(self, id: Uuid) -> PointEntity {
        PointEntity {
            id,
            set_id: self.set_id,
            point_number: self.point_number,
            winner: self.winner,
            winning_shot: self.winning_shot,
            other_shot: self.other_shot,
            created_at: SystemTime::now(),
        }
    }
}

impl MatchEntity {
    /// Apply a partial update in place, bumping `updated_at`.
    pub fn apply(&mut self, patch: MatchPatch) {
        if let Some(match_score) = patch.match_score {
            self.match_score = match_score;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.updated_at = SystemTime::now();
    }
}

impl SetEntity {
    /// Apply an absolute score update in place.
    pub fn apply(&mut self, patch: SetPatch) {
        self.player_score = patch.player_score;
        self.opponent_score = patch.opponent_score;
        self.score = patch.score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_serializes_with_wire_names() {
        assert_eq!(serde_json::to_string(&Side::Player).unwrap(), "\"self\"");
        assert_eq!(
            serde_json::from_str::<Side>("\"opponent\"").unwrap(),
            Side::Opponent
        );
    }

    #[test]
    fn set_patch_keeps_display_score_in_sync() {
        let mut set = NewSetEntity::empty(Uuid::new_v4(), 1).into_entity(Uuid::new_v4());
        set.apply(SetPatch::from_scores(7, 5));
        assert_eq!((set.player_score, set.opponent_score), (7, 5));
        assert_eq!(set.score, "7-5");
    }

    #[test]
    fn shot_ref_defaults_lucky_to_false() {
        let shot: ShotRef =
            serde_json::from_str(r#"{"shot_id":"loop","hand":"forehand"}"#).unwrap();
        assert!(!shot.lucky);
        assert_eq!(shot.hand, Hand::Forehand);
    }
}
