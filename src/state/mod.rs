pub mod catalog;
mod sse;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::score_gateway::ScoreGateway,
    error::ServiceError,
    scoring::{ScoringEngine, rules::MatchFormat},
};

pub use self::catalog::{ShotCatalog, ShotDefinition};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;
/// A live match engine. The mutex serialises operations on one match.
pub type SharedEngine = Arc<Mutex<Box<dyn ScoringEngine>>>;

const SSE_CAPACITY: usize = 64;

/// A loaded engine and when a request last reached it.
struct LoadedMatch {
    engine: SharedEngine,
    /// Milliseconds since [`AppState::started`].
    last_used: AtomicU64,
}

/// Central application state: the storage gateway, loaded matches and the event hub.
pub struct AppState {
    gateway: Arc<dyn ScoreGateway>,
    default_format: MatchFormat,
    shots: ShotCatalog,
    matches: DashMap<Uuid, LoadedMatch>,
    sse: SseHub,
    idle_timeout: Duration,
    started: Instant,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(gateway: Arc<dyn ScoreGateway>, config: AppConfig) -> SharedState {
        let idle_timeout = config.idle_timeout();
        let (default_format, shots) = config.into_parts();
        Arc::new(Self {
            gateway,
            default_format,
            shots,
            matches: DashMap::new(),
            sse: SseHub::new(SSE_CAPACITY),
            idle_timeout,
            started: Instant::now(),
        })
    }

    /// Handle to the storage gateway shared by every match.
    pub fn gateway(&self) -> Arc<dyn ScoreGateway> {
        self.gateway.clone()
    }

    pub fn default_format(&self) -> MatchFormat {
        self.default_format
    }

    pub fn shots(&self) -> &ShotCatalog {
        &self.shots
    }

    /// Broadcast hub used for the match SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// How long a loaded match may go unused before it is evicted.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Register a live engine unless one is already loaded for the same match,
    /// in which case the loaded one wins and is returned.
    pub fn install_engine(&self, engine: Box<dyn ScoringEngine>) -> SharedEngine {
        let now = self.now_ms();
        match self.matches.entry(engine.match_id()) {
            Entry::Occupied(entry) => {
                entry.get().last_used.store(now, Ordering::Relaxed);
                entry.get().engine.clone()
            }
            Entry::Vacant(entry) => {
                let shared = Arc::new(Mutex::new(engine));
                entry.insert(LoadedMatch {
                    engine: shared.clone(),
                    last_used: AtomicU64::new(now),
                });
                shared
            }
        }
    }

    /// Engine of a loaded match, if any.
    pub fn loaded_engine(&self, match_id: Uuid) -> Option<SharedEngine> {
        self.matches.get(&match_id).map(|loaded| {
            loaded.last_used.store(self.now_ms(), Ordering::Relaxed);
            loaded.engine.clone()
        })
    }

    /// Engine of a loaded match.
    pub fn engine(&self, match_id: Uuid) -> Result<SharedEngine, ServiceError> {
        self.loaded_engine(match_id).ok_or_else(|| {
            ServiceError::NotFound(format!(
                "match `{match_id}` is not loaded; resume it first"
            ))
        })
    }

    /// Drop engines unused for at least `max_idle`. Busy engines and engines
    /// holding an interrupted write stay loaded. Returns the evicted match ids.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<Uuid> {
        let now = self.now_ms();
        let max_idle = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);
        let mut evicted = Vec::new();

        self.matches.retain(|match_id, loaded| {
            let idle = now.saturating_sub(loaded.last_used.load(Ordering::Relaxed));
            if idle < max_idle {
                return true;
            }
            let keep = match loaded.engine.try_lock() {
                Ok(engine) => engine.has_unfinished_write(),
                Err(_) => true,
            };
            if !keep {
                evicted.push(*match_id);
            }
            keep
        });
        evicted
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn loaded_matches(&self) -> usize {
        self.matches.len()
    }
}

/// Claim exclusive access for a mutating operation without queueing behind another one.
pub fn lock_for_update(
    engine: &SharedEngine,
) -> Result<MutexGuard<'_, Box<dyn ScoringEngine>>, ServiceError> {
    engine.try_lock().map_err(|_| {
        ServiceError::InvalidState("another operation is in progress for this match".into())
    })
}
