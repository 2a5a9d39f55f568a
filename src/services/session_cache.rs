// Session cache
//
// Keeps one live session per connection name. Sessions are opened lazily on first use,
// reused while they keep being accessed, and closed once they sit idle past the idle
// timeout, are invalidated, or the cache shuts down. Concurrent misses for the same
// name share a single load, which runs on its own task so it completes even when every
// caller gives up. Closes run on detached tasks and never hold up the caller that
// removed the session.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::middleware::AppError;
use crate::config::CacheConfig;
use crate::models::ConnectionDetails;
use crate::services::database::SessionConnector;
use crate::services::session::Session;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Resolves connection names to stored connection details.
#[async_trait::async_trait]
pub trait ConnectionDirectory: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<Option<ConnectionDetails>, AppError>;
}

/// Why a session left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Idle for longer than the idle timeout
    Expired,
    /// Dropped through `invalidate`, or superseded while it was being opened
    Explicit,
    /// The cache was shut down
    Shutdown,
}

/// Hook invoked for every session removed from the cache.
///
/// Runs on its own task. Errors are logged by the cache and never reach the caller that
/// caused the removal.
#[async_trait::async_trait]
pub trait EvictionListener: Send + Sync {
    async fn on_evict(&self, session: Arc<Session>, cause: RemovalCause) -> anyhow::Result<()>;
}

/// Default listener: close the evicted session.
#[derive(Debug, Default)]
pub struct CloseOnEvict;

#[async_trait::async_trait]
impl EvictionListener for CloseOnEvict {
    async fn on_evict(&self, session: Arc<Session>, _cause: RemovalCause) -> anyhow::Result<()> {
        session.close().await
    }
}

/// Session cache settings
#[derive(Debug, Clone, Copy)]
pub struct SessionCacheConfig {
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl From<&CacheConfig> for SessionCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }
}

/// Cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub expirations: u64,
    pub invalidations: u64,
}

type SessionLoad = Shared<BoxFuture<'static, Result<Arc<Session>, AppError>>>;

enum Slot {
    Loading { generation: u64, load: SessionLoad },
    Ready(Arc<Session>),
}

enum Lookup {
    Pending(SessionLoad),
    Expired,
    Missing,
}

struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    stats: Mutex<CacheStats>,
    closing: Mutex<Vec<JoinHandle<()>>>,
    directory: Arc<dyn ConnectionDirectory>,
    connector: Arc<dyn SessionConnector>,
    listener: Arc<dyn EvictionListener>,
    config: SessionCacheConfig,
    next_generation: AtomicU64,
}

/// Keyed cache of live sessions with idle-based eviction.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<Inner>,
}

impl SessionCache {
    /// Create a cache that closes sessions on eviction
    pub fn new(
        directory: Arc<dyn ConnectionDirectory>,
        connector: Arc<dyn SessionConnector>,
        config: SessionCacheConfig,
    ) -> Self {
        Self::with_listener(directory, connector, Arc::new(CloseOnEvict), config)
    }

    /// Create a cache with a custom eviction hook
    pub fn with_listener(
        directory: Arc<dyn ConnectionDirectory>,
        connector: Arc<dyn SessionConnector>,
        listener: Arc<dyn EvictionListener>,
        config: SessionCacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                stats: Mutex::new(CacheStats::default()),
                closing: Mutex::new(Vec::new()),
                directory,
                connector,
                listener,
                config,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Get the session for `name`, opening it if it is not cached or has expired.
    ///
    /// Concurrent calls for a name that is being opened wait on the same load and
    /// observe the same session or the same error.
    pub async fn get(&self, name: &str) -> Result<Arc<Session>, AppError> {
        let load = {
            let mut slots = lock(&self.inner.slots);
            let now = Instant::now();

            let lookup = match slots.get(name) {
                Some(Slot::Ready(session)) => {
                    if session.idle_for(now) > self.inner.config.idle_timeout {
                        Lookup::Expired
                    } else {
                        session.touch();
                        lock(&self.inner.stats).hits += 1;
                        tracing::debug!("Using cached session {} for {}", session.id(), name);
                        return Ok(Arc::clone(session));
                    }
                }
                Some(Slot::Loading { load, .. }) => Lookup::Pending(load.clone()),
                None => Lookup::Missing,
            };

            match lookup {
                Lookup::Pending(load) => load,
                Lookup::Expired => {
                    if let Some(Slot::Ready(stale)) = slots.remove(name) {
                        lock(&self.inner.stats).expirations += 1;
                        self.inner.evict(stale, RemovalCause::Expired);
                    }
                    self.start_load(&mut slots, name)
                }
                Lookup::Missing => self.start_load(&mut slots, name),
            }
        };

        load.await
    }

    /// Drop the cached session for `name`, if any, and schedule its close.
    ///
    /// A load in progress is discarded; the session it produces is closed instead of cached.
    pub async fn invalidate(&self, name: &str) {
        let removed = lock(&self.inner.slots).remove(name);

        match removed {
            Some(Slot::Ready(session)) => {
                lock(&self.inner.stats).invalidations += 1;
                self.inner.evict(session, RemovalCause::Explicit);
            }
            Some(Slot::Loading { .. }) => {
                lock(&self.inner.stats).invalidations += 1;
                tracing::info!("Discarding pending connection to {}", name);
            }
            None => {}
        }
    }

    /// Remove every session idle past the timeout and schedule its close.
    /// Returns how many were evicted.
    pub async fn sweep(&self) -> usize {
        let expired: Vec<Arc<Session>> = {
            let mut slots = lock(&self.inner.slots);
            let now = Instant::now();
            let idle_timeout = self.inner.config.idle_timeout;

            let names: Vec<String> = slots
                .iter()
                .filter_map(|(name, slot)| match slot {
                    Slot::Ready(session) if session.idle_for(now) > idle_timeout => Some(name.clone()),
                    _ => None,
                })
                .collect();

            names
                .iter()
                .filter_map(|name| match slots.remove(name) {
                    Some(Slot::Ready(session)) => Some(session),
                    _ => None,
                })
                .collect()
        };

        let count = expired.len();
        if count > 0 {
            lock(&self.inner.stats).expirations += count as u64;
            for session in expired {
                self.inner.evict(session, RemovalCause::Expired);
            }
            tracing::debug!("Sweep evicted {} idle sessions", count);
        }

        count
    }

    /// Close and drop every cached session.
    ///
    /// Loads still in flight are discarded and waited for, so whatever they open gets
    /// closed too. Returns once every scheduled close has finished.
    pub async fn shutdown(&self) {
        let mut sessions = Vec::new();
        let mut loads = Vec::new();
        for (_, slot) in lock(&self.inner.slots).drain() {
            match slot {
                Slot::Ready(session) => sessions.push(session),
                Slot::Loading { load, .. } => loads.push(load),
            }
        }

        tracing::info!(
            "Shutting down session cache, closing {} sessions ({} still opening)",
            sessions.len(),
            loads.len()
        );
        for session in sessions {
            self.inner.evict(session, RemovalCause::Shutdown);
        }
        futures::future::join_all(loads).await;

        self.wait_for_pending_closes().await;
    }

    /// Wait for every close scheduled so far
    pub(crate) async fn wait_for_pending_closes(&self) {
        let closing: Vec<JoinHandle<()>> = lock(&self.inner.closing).drain(..).collect();
        for result in futures::future::join_all(closing).await {
            if let Err(e) = result {
                tracing::warn!("Session close task terminated abnormally: {}", e);
            }
        }
    }

    /// Spawn the periodic sweep task
    pub fn start_sweeper(&self) -> SweeperHandle {
        let cache = self.clone();
        let period = if self.inner.config.sweep_interval.is_zero() {
            tracing::warn!(
                "Sweep interval must be positive, using {:?}",
                DEFAULT_SWEEP_INTERVAL
            );
            DEFAULT_SWEEP_INTERVAL
        } else {
            self.inner.config.sweep_interval
        };
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        cache.sweep().await;
                    }
                }
            }
            tracing::debug!("Session sweeper stopped");
        });

        tracing::info!(
            "Session sweeper started (idle timeout: {:?}, interval: {:?})",
            self.inner.config.idle_timeout,
            period
        );

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    /// Number of open sessions held by the cache
    pub fn session_count(&self) -> usize {
        lock(&self.inner.slots)
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.inner.stats).clone()
    }

    fn start_load(&self, slots: &mut HashMap<String, Slot>, name: &str) -> SessionLoad {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        // the task only touches `slots` after the caller releases the lock, so it always
        // finds its own Loading entry unless that was removed in the meantime
        let task = tokio::spawn(Arc::clone(&self.inner).load(name.to_string(), generation));
        let load = async move {
            task.await
                .unwrap_or_else(|e| Err(AppError::Internal(format!("session load task failed: {}", e))))
        }
        .boxed()
        .shared();

        slots.insert(
            name.to_string(),
            Slot::Loading {
                generation,
                load: load.clone(),
            },
        );
        load
    }
}

impl Inner {
    async fn load(self: Arc<Self>, name: String, generation: u64) -> Result<Arc<Session>, AppError> {
        let result = self.open(&name, generation).await;

        let superseded = {
            let mut slots = lock(&self.slots);
            let current = matches!(
                slots.get(&name),
                Some(Slot::Loading { generation: g, .. }) if *g == generation
            );

            match &result {
                Ok(session) if current => {
                    session.touch();
                    slots.insert(name.clone(), Slot::Ready(Arc::clone(session)));
                    None
                }
                Ok(session) => Some(Arc::clone(session)),
                Err(_) => {
                    if current {
                        slots.remove(&name);
                    }
                    None
                }
            }
        };

        {
            let mut stats = lock(&self.stats);
            match &result {
                Ok(_) => stats.loads += 1,
                Err(_) => stats.load_failures += 1,
            }
        }

        if let Some(session) = superseded {
            self.evict(session, RemovalCause::Explicit);
            return Err(AppError::SqlExecution(format!(
                "connection {} was invalidated while it was being established",
                name
            )));
        }

        result
    }

    async fn open(&self, name: &str, id: u64) -> Result<Arc<Session>, AppError> {
        let details = self
            .directory
            .lookup(name)
            .await?
            .ok_or_else(|| AppError::ConnectionNotFound(name.to_string()))?;

        tracing::info!("Opening connection to {} ({})", name, details.masked_url());

        let client = self.connector.connect(&details).await.map_err(|e| {
            tracing::info!("Failed to open connection to {}: {:#}", name, e);
            AppError::SqlExecution(format!("{:#}", e))
        })?;

        Ok(Arc::new(Session::new(name, id, client)))
    }

    /// Hand a removed session to the listener on a detached task.
    fn evict(&self, session: Arc<Session>, cause: RemovalCause) {
        let name = session.connection_name().to_string();
        tracing::info!("Closing connection to {} ({:?})", name, cause);

        let listener = Arc::clone(&self.listener);
        let task = tokio::spawn(async move {
            if let Err(e) = listener.on_evict(session, cause).await {
                tracing::warn!("Error occurred during connection shutdown of {} [ignored]: {:#}", name, e);
            }
        });

        let mut closing = lock(&self.closing);
        closing.retain(|task| !task.is_finished());
        closing.push(task);
    }
}

/// Handle of the periodic sweep task
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep task and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Session sweeper terminated abnormally: {}", e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
