use crate::clock::Clock;
use crate::session::{CreatedSession, PoolStatus, SessionRecord, SessionStatus};
use chrono::{DateTime, Duration, Utc};
use memdemo_core::{DemoError, DemoResult, KeyMode};
use memdemo_engine::MemoryEngine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Capacity and TTL settings for the session pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum simultaneously live sessions.
    pub max_sessions: usize,
    /// Absolute session lifetime from creation.
    pub session_ttl: std::time::Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions: 8,
            session_ttl: std::time::Duration::from_secs(5 * 60),
        }
    }
}

/// Proof that one pool slot has been reserved for an insert.
///
/// Obtained from [`SessionStore::try_admit`] and consumed by
/// [`SessionStore::insert`]. The reserved slot counts against capacity
/// while the engine bootstrap runs outside the store lock, which is
/// what keeps check-then-insert atomic without holding the lock across
/// a network call. Dropping an unconsumed permit returns the slot, so
/// a create future cancelled mid-bootstrap cannot shrink the pool.
#[derive(Debug)]
#[must_use = "a permit holds a pool slot until inserted or dropped"]
pub struct AdmissionPermit {
    reserved: Arc<AtomicUsize>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.reserved.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StoreInner {
    sessions: HashMap<Uuid, SessionRecord>,
}

/// In-memory session store.
///
/// A single async mutex serializes every mutation and every
/// capacity/quota check; the expensive engine calls happen between
/// lock acquisitions, never under one.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    // Outstanding permits. Incremented only under the store lock;
    // decremented by permit drop, which may happen anywhere.
    reserved: Arc<AtomicUsize>,
    config: PoolConfig,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new(config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                sessions: HashMap::new(),
            }),
            reserved: Arc::new(AtomicUsize::new(0)),
            config,
            clock,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_std(self.config.session_ttl).unwrap_or_else(|_| Duration::minutes(5))
    }

    /// Reserves a pool slot, sweeping expired sessions first so they
    /// do not falsely occupy capacity.
    ///
    /// Fails with [`DemoError::CapacityExceeded`] when live plus
    /// reserved sessions are at the cap.
    pub async fn try_admit(&self) -> DemoResult<AdmissionPermit> {
        let expired;
        let result;
        {
            let mut inner = self.inner.lock().await;
            expired = take_expired(&mut inner, self.clock.now());
            let occupied = inner.sessions.len() + self.reserved.load(Ordering::SeqCst);
            if occupied >= self.config.max_sessions {
                result = Err(DemoError::CapacityExceeded {
                    active: occupied,
                    max: self.config.max_sessions,
                });
            } else {
                self.reserved.fetch_add(1, Ordering::SeqCst);
                result = Ok(AdmissionPermit {
                    reserved: self.reserved.clone(),
                });
            }
        }
        release_all(expired).await;
        result
    }

    /// Converts a permit into a live record and returns the creation
    /// outcome. The record's timestamps come from the store clock.
    pub async fn insert(
        &self,
        permit: AdmissionPermit,
        owner: impl Into<String>,
        key_mode: KeyMode,
        turn_limit: u32,
        engine: Arc<dyn MemoryEngine>,
    ) -> CreatedSession {
        let now = self.clock.now();
        let record = SessionRecord::new(owner, key_mode, turn_limit, engine, now, self.ttl());
        let created = CreatedSession {
            session_id: record.id,
            turn_limit: record.turn_limit,
            expires_at: record.expires_at,
            remaining_secs: (record.expires_at - now).num_seconds(),
        };

        let mut inner = self.inner.lock().await;
        info!(
            session_id = %record.id,
            owner = %record.owner,
            active = inner.sessions.len() + 1,
            max = self.config.max_sessions,
            "Created session"
        );
        inner.sessions.insert(record.id, record);
        // The slot moves from reserved to live under the same lock
        // acquisition, so occupancy never double-counts it.
        drop(permit);
        created
    }

    /// Removes every session past its expiry, releasing each engine
    /// handle. Returns how many were removed. Idempotent.
    pub async fn sweep(&self) -> usize {
        let expired = {
            let mut inner = self.inner.lock().await;
            take_expired(&mut inner, self.clock.now())
        };
        let count = expired.len();
        release_all(expired).await;
        count
    }

    /// Validates a chat attempt and hands back the engine to call.
    ///
    /// Expiry takes precedence over quota: an expired session is
    /// removed and reported [`DemoError::Expired`] even when turns
    /// remain.
    pub async fn begin_chat(&self, id: Uuid) -> DemoResult<Arc<dyn MemoryEngine>> {
        let removed;
        let result;
        {
            let mut inner = self.inner.lock().await;
            let now = self.clock.now();
            match inner.sessions.get(&id) {
                None => {
                    removed = None;
                    result = Err(DemoError::NotFound);
                }
                Some(record) if record.is_expired(now) => {
                    removed = inner.sessions.remove(&id);
                    result = Err(DemoError::Expired);
                }
                Some(record) if !record.has_turns_left() => {
                    removed = None;
                    result = Err(DemoError::QuotaExceeded {
                        limit: record.turn_limit,
                    });
                }
                Some(record) => {
                    removed = None;
                    result = Ok(record.engine.clone());
                }
            }
        }
        if let Some(record) = removed {
            release_all(vec![record]).await;
        }
        result
    }

    /// Commits a successful chat exchange: re-validates the record,
    /// increments the turn counter, refreshes activity, and returns
    /// the updated projection.
    ///
    /// State may have changed while the engine call ran unlocked, so
    /// every precondition is checked again here.
    pub async fn commit_turn(&self, id: Uuid) -> DemoResult<SessionStatus> {
        let removed;
        let result;
        {
            let mut inner = self.inner.lock().await;
            let now = self.clock.now();
            match inner.sessions.get_mut(&id) {
                None => {
                    removed = None;
                    result = Err(DemoError::NotFound);
                }
                Some(record) if record.is_expired(now) => {
                    removed = inner.sessions.remove(&id);
                    result = Err(DemoError::Expired);
                }
                Some(record) if !record.has_turns_left() => {
                    removed = None;
                    result = Err(DemoError::QuotaExceeded {
                        limit: record.turn_limit,
                    });
                }
                Some(record) => {
                    record.turn_count += 1;
                    record.last_activity_at = now;
                    removed = None;
                    result = Ok(record.status(now));
                }
            }
        }
        if let Some(record) = removed {
            release_all(vec![record]).await;
        }
        result
    }

    /// Read-only lookup with the same lazy-expiry behavior as chat:
    /// an expired record is removed as a side effect.
    pub async fn status(&self, id: Uuid) -> DemoResult<SessionStatus> {
        let removed;
        let result;
        {
            let mut inner = self.inner.lock().await;
            let now = self.clock.now();
            match inner.sessions.get(&id) {
                None => {
                    removed = None;
                    result = Err(DemoError::NotFound);
                }
                Some(record) if record.is_expired(now) => {
                    removed = inner.sessions.remove(&id);
                    result = Err(DemoError::Expired);
                }
                Some(record) => {
                    removed = None;
                    result = Ok(record.status(now));
                }
            }
        }
        if let Some(record) = removed {
            release_all(vec![record]).await;
        }
        result
    }

    /// Removes a session if present, releasing its engine handle.
    /// Idempotent: removing an absent id is a no-op, and the return
    /// value only says whether a record was actually there.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = {
            let mut inner = self.inner.lock().await;
            inner.sessions.remove(&id)
        };
        match removed {
            Some(record) => {
                info!(session_id = %id, owner = %record.owner, "Deleted session");
                record.engine.release().await;
                true
            }
            None => false,
        }
    }

    /// Pool occupancy after sweeping expired sessions.
    pub async fn pool_status(&self) -> PoolStatus {
        let (expired, status) = {
            let mut inner = self.inner.lock().await;
            let expired = take_expired(&mut inner, self.clock.now());
            let occupied = inner.sessions.len() + self.reserved.load(Ordering::SeqCst);
            let status = PoolStatus {
                active_sessions: inner.sessions.len(),
                max_sessions: self.config.max_sessions,
                available_slots: self.config.max_sessions.saturating_sub(occupied),
            };
            (expired, status)
        };
        release_all(expired).await;
        status
    }

    /// Number of live records (expired-but-unswept included).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn take_expired(inner: &mut StoreInner, now: DateTime<Utc>) -> Vec<SessionRecord> {
    let ids: Vec<Uuid> = inner
        .sessions
        .iter()
        .filter(|(_, record)| record.is_expired(now))
        .map(|(id, _)| *id)
        .collect();
    ids.into_iter()
        .filter_map(|id| inner.sessions.remove(&id))
        .collect()
}

/// Releases engine handles outside the store lock. One handle failing
/// to release cannot stop the rest: the trait makes release
/// infallible, so each record is handled independently.
async fn release_all(expired: Vec<SessionRecord>) {
    for record in expired {
        info!(session_id = %record.id, owner = %record.owner, "Removing expired session");
        record.engine.release().await;
        debug!(session_id = %record.id, "Engine handle released");
    }
}
