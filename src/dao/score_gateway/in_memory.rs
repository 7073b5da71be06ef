//! Process-local [`ScoreGateway`] used when no database is configured and as the
//! test double for the scoring engine.

use std::{collections::VecDeque, io, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{
        MatchEntity, MatchPatch, NewMatchEntity, NewPointEntity, NewSetEntity, PointEntity,
        SetEntity, SetPatch,
    },
    score_gateway::ScoreGateway,
    storage::{RejectionKind, StorageError, StorageResult},
};

/// Gateway operations, used to address injected failures and call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    CreateMatch,
    UpdateMatch,
    FindMatch,
    ListSets,
    CreateSet,
    UpdateSet,
    DeleteSet,
    CreatePoint,
    DeletePoint,
    HealthCheck,
}

/// Failure returned by the next call to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Behaves like a dropped connection or a timeout.
    Transport,
    /// Behaves like the backend refusing the request.
    Rejected(RejectionKind),
}

#[derive(Default)]
struct Inner {
    matches: DashMap<Uuid, MatchEntity>,
    sets: DashMap<Uuid, SetEntity>,
    points: DashMap<Uuid, PointEntity>,
    failures: DashMap<GatewayOp, VecDeque<InjectedFailure>>,
    calls: DashMap<GatewayOp, usize>,
}

/// DashMap-backed store keeping every record in memory.
#[derive(Clone, Default)]
pub struct InMemoryScoreGateway {
    inner: Arc<Inner>,
}

impl InMemoryScoreGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next call to `op`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: GatewayOp, failure: InjectedFailure) {
        self.inner.failures.entry(op).or_default().push_back(failure);
    }

    /// Number of times `op` was invoked, failed calls included.
    pub fn calls(&self, op: GatewayOp) -> usize {
        self.inner.calls.get(&op).map(|count| *count).unwrap_or(0)
    }

    /// Sets stored for a match, ordered by set number.
    pub fn sets_of(&self, match_id: Uuid) -> Vec<SetEntity> {
        let mut sets = self
            .inner
            .sets
            .iter()
            .filter(|entry| entry.match_id == match_id)
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        sets.sort_by_key(|set| set.set_number);
        sets
    }

    /// Points stored for a set, ordered by point number.
    pub fn points_of(&self, set_id: Uuid) -> Vec<PointEntity> {
        let mut points = self
            .inner
            .points
            .iter()
            .filter(|entry| entry.set_id == set_id)
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        points.sort_by_key(|point| point.point_number);
        points
    }

    /// Current persisted copy of a match header.
    pub fn match_of(&self, id: Uuid) -> Option<MatchEntity> {
        self.inner.matches.get(&id).map(|entry| entry.value().clone())
    }

    /// Count the call and pop the next injected failure for `op`, if any.
    fn enter(&self, op: GatewayOp) -> StorageResult<()> {
        *self.inner.calls.entry(op).or_insert(0) += 1;

        let failure = self
            .inner
            .failures
            .get_mut(&op)
            .and_then(|mut queue| queue.pop_front());

        match failure {
            None => Ok(()),
            Some(InjectedFailure::Transport) => {
                debug!(?op, "injecting transport failure");
                Err(StorageError::unavailable(
                    format!("{op:?} failed"),
                    io::Error::new(io::ErrorKind::TimedOut, "injected transport failure"),
                ))
            }
            Some(InjectedFailure::Rejected(kind)) => {
                debug!(?op, %kind, "injecting rejection");
                Err(StorageError::rejected(kind, format!("{op:?} rejected")))
            }
        }
    }
}

fn not_found(what: &str, id: Uuid) -> StorageError {
    StorageError::rejected(RejectionKind::NotFound, format!("{what} `{id}` not found"))
}

impl ScoreGateway for InMemoryScoreGateway {
    fn create_match(
        &self,
        new_match: NewMatchEntity,
    ) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::CreateMatch)?;
            let entity = new_match.into_entity(Uuid::new_v4());
            store.inner.matches.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn update_match(
        &self,
        id: Uuid,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::UpdateMatch)?;
            let mut entry = store
                .inner
                .matches
                .get_mut(&id)
                .ok_or_else(|| not_found("match", id))?;
            entry.apply(patch);
            Ok(entry.value().clone())
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::FindMatch)?;
            Ok(store.match_of(id))
        })
    }

    fn list_sets_by_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SetEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::ListSets)?;
            Ok(store.sets_of(match_id))
        })
    }

    fn create_set(&self, new_set: NewSetEntity) -> BoxFuture<'static, StorageResult<SetEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::CreateSet)?;
            if !store.inner.matches.contains_key(&new_set.match_id) {
                return Err(not_found("match", new_set.match_id));
            }
            let taken = store.inner.sets.iter().any(|entry| {
                entry.match_id == new_set.match_id && entry.set_number == new_set.set_number
            });
            if taken {
                return Err(StorageError::rejected(
                    RejectionKind::Conflict,
                    format!(
                        "set {} already exists for match `{}`",
                        new_set.set_number, new_set.match_id
                    ),
                ));
            }
            let entity = new_set.into_entity(Uuid::new_v4());
            store.inner.sets.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn update_set(
        &self,
        id: Uuid,
        patch: SetPatch,
    ) -> BoxFuture<'static, StorageResult<SetEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::UpdateSet)?;
            let mut entry = store
                .inner
                .sets
                .get_mut(&id)
                .ok_or_else(|| not_found("set", id))?;
            entry.apply(patch);
            Ok(entry.value().clone())
        })
    }

    fn delete_set(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::DeleteSet)?;
            store
                .inner
                .sets
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| not_found("set", id))
        })
    }

    fn create_point(
        &self,
        new_point: NewPointEntity,
    ) -> BoxFuture<'static, StorageResult<PointEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::CreatePoint)?;
            if !store.inner.sets.contains_key(&new_point.set_id) {
                return Err(not_found("set", new_point.set_id));
            }
            let entity = new_point.into_entity(Uuid::new_v4());
            store.inner.points.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn delete_point(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.enter(GatewayOp::DeletePoint)?;
            store
                .inner
                .points
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| not_found("point", id))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.enter(GatewayOp::HealthCheck) })
    }
}
