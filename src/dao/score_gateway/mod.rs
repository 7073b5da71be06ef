#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod in_memory;

use crate::dao::models::{
    MatchEntity, MatchPatch, NewMatchEntity, NewPointEntity, NewSetEntity, PointEntity, SetEntity,
    SetPatch,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for matches, sets and points.
///
/// Every call is a single request/response exchange. The scoring engine issues
/// them strictly one after another, feeding identifiers returned by earlier
/// calls into later ones.
pub trait ScoreGateway: Send + Sync {
    fn create_match(
        &self,
        new_match: NewMatchEntity,
    ) -> BoxFuture<'static, StorageResult<MatchEntity>>;
    fn update_match(
        &self,
        id: Uuid,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<MatchEntity>>;
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Sets of a match ordered by `set_number`.
    fn list_sets_by_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SetEntity>>>;
    /// Fails with a `Conflict` rejection when the set number is already taken.
    fn create_set(&self, new_set: NewSetEntity) -> BoxFuture<'static, StorageResult<SetEntity>>;
    fn update_set(
        &self,
        id: Uuid,
        patch: SetPatch,
    ) -> BoxFuture<'static, StorageResult<SetEntity>>;
    fn delete_set(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    fn create_point(
        &self,
        new_point: NewPointEntity,
    ) -> BoxFuture<'static, StorageResult<PointEntity>>;
    fn delete_point(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
