use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{MatchEntity, PointEntity, SetEntity, ShotRef, Side};

pub const MATCH_PREFIX: &str = "match::";
pub const SET_PREFIX: &str = "set::";
pub const POINT_PREFIX: &str = "point::";

/// Discriminator stored on every document so Mango selectors can target one kind.
pub const SET_KIND: &str = "set";

#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRevision {
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchMatchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: MatchBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchBody {
    pub match_id: Uuid,
    pub opponent_name: String,
    pub date: SystemTime,
    pub match_score: String,
    pub notes: String,
    pub initial_server: Side,
    pub best_of: u8,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl From<(MatchEntity, Option<String>)> for CouchMatchDocument {
    fn from((entity, rev): (MatchEntity, Option<String>)) -> Self {
        Self {
            id: match_doc_id(entity.id),
            rev,
            body: MatchBody {
                match_id: entity.id,
                opponent_name: entity.opponent_name,
                date: entity.date,
                match_score: entity.match_score,
                notes: entity.notes,
                initial_server: entity.initial_server,
                best_of: entity.best_of,
                created_at: entity.created_at,
                updated_at: entity.updated_at,
            },
        }
    }
}

impl From<CouchMatchDocument> for MatchEntity {
    fn from(doc: CouchMatchDocument) -> Self {
        let body = doc.body;
        Self {
            id: body.match_id,
            opponent_name: body.opponent_name,
            date: body.date,
            match_score: body.match_score,
            notes: body.notes,
            initial_server: body.initial_server,
            best_of: body.best_of,
            created_at: body.created_at,
            updated_at: body.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSetDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub kind: String,
    #[serde(flatten)]
    pub body: SetBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBody {
    pub set_id: Uuid,
    pub match_id: Uuid,
    pub set_number: u32,
    pub player_score: u32,
    pub opponent_score: u32,
    pub score: String,
}

impl From<(SetEntity, Option<String>)> for CouchSetDocument {
    fn from((entity, rev): (SetEntity, Option<String>)) -> Self {
        Self {
            id: set_doc_id(entity.id),
            rev,
            kind: SET_KIND.to_string(),
            body: SetBody {
                set_id: entity.id,
                match_id: entity.match_id,
                set_number: entity.set_number,
                player_score: entity.player_score,
                opponent_score: entity.opponent_score,
                score: entity.score,
            },
        }
    }
}

impl From<CouchSetDocument> for SetEntity {
    fn from(doc: CouchSetDocument) -> Self {
        let body = doc.body;
        Self {
            id: body.set_id,
            match_id: body.match_id,
            set_number: body.set_number,
            player_score: body.player_score,
            opponent_score: body.opponent_score,
            score: body.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchPointDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: PointBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointBody {
    pub point_id: Uuid,
    pub set_id: Uuid,
    pub point_number: u32,
    pub winner: Side,
    pub winning_shot: ShotRef,
    pub other_shot: ShotRef,
    pub created_at: SystemTime,
}

impl From<PointEntity> for CouchPointDocument {
    fn from(entity: PointEntity) -> Self {
        Self {
            id: point_doc_id(entity.id),
            rev: None,
            body: PointBody {
                point_id: entity.id,
                set_id: entity.set_id,
                point_number: entity.point_number,
                winner: entity.winner,
                winning_shot: entity.winning_shot,
                other_shot: entity.other_shot,
                created_at: entity.created_at,
            },
        }
    }
}

pub fn match_doc_id(id: Uuid) -> String {
    format!("{}{}", MATCH_PREFIX, id)
}

pub fn set_doc_id(id: Uuid) -> String {
    format!("{}{}", SET_PREFIX, id)
}

pub fn point_doc_id(id: Uuid) -> String {
    format!("{}{}", POINT_PREFIX, id)
}
