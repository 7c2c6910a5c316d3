use chrono::{DateTime, Duration, Utc};
use memdemo_core::KeyMode;
use memdemo_engine::MemoryEngine;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// One live session: identity, quota state, timestamps, and the engine
/// handle it exclusively owns.
///
/// `expires_at` is absolute: fixed at creation, never extended by
/// activity. `turn_count` only moves up, and only on a successful chat
/// exchange.
pub struct SessionRecord {
    /// Unique session identifier.
    pub id: Uuid,
    /// Contact identity of whoever opened the session.
    pub owner: String,
    /// Credential tier, fixed at creation.
    pub key_mode: KeyMode,
    /// Turn allowance, fixed at creation from the quota policy.
    pub turn_limit: u32,
    /// Successful chat exchanges so far.
    pub turn_count: u32,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last successful chat exchange (creation time before any chat).
    pub last_activity_at: DateTime<Utc>,
    /// Absolute expiry: `created_at + TTL`.
    pub expires_at: DateTime<Utc>,
    /// The memory engine backing this session. Released on removal.
    pub engine: Arc<dyn MemoryEngine>,
}

impl SessionRecord {
    /// Creates a record expiring `ttl` after `now`.
    pub fn new(
        owner: impl Into<String>,
        key_mode: KeyMode,
        turn_limit: u32,
        engine: Arc<dyn MemoryEngine>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            key_mode,
            turn_limit,
            turn_count: 0,
            created_at: now,
            last_activity_at: now,
            expires_at: now + ttl,
            engine,
        }
    }

    /// Whether the absolute TTL has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the turn allowance still has room.
    pub fn has_turns_left(&self) -> bool {
        self.turn_count < self.turn_limit
    }

    /// Whether another chat exchange would be admitted right now.
    pub fn can_chat(&self, now: DateTime<Utc>) -> bool {
        self.has_turns_left() && !self.is_expired(now)
    }

    /// Read-only projection of this record.
    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        SessionStatus {
            session_id: self.id,
            turn_count: self.turn_count,
            turn_limit: self.turn_limit,
            expires_at: self.expires_at,
            remaining_secs: (self.expires_at - now).num_seconds().max(0),
            can_chat: self.can_chat(now),
        }
    }
}

/// Read-only view of a session, safe to hand to the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// The session identifier.
    pub session_id: Uuid,
    /// Successful chat exchanges so far.
    pub turn_count: u32,
    /// Turn allowance.
    pub turn_limit: u32,
    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry, clamped at zero.
    pub remaining_secs: i64,
    /// Whether another chat would currently be admitted.
    pub can_chat: bool,
}

/// Outcome of a successful create operation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    /// The new session identifier.
    pub session_id: Uuid,
    /// Turn allowance resolved from the key mode.
    pub turn_limit: u32,
    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry at creation time.
    pub remaining_secs: i64,
}

/// Outcome of a successful chat exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// The engine's answer.
    pub response: String,
    /// Turn count after this exchange.
    pub turn_count: u32,
    /// Turn allowance.
    pub turn_limit: u32,
    /// Seconds until expiry, clamped at zero.
    pub remaining_secs: i64,
}

/// Occupancy snapshot of the session pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// Live sessions after sweeping expired ones.
    pub active_sessions: usize,
    /// Configured concurrency maximum.
    pub max_sessions: usize,
    /// Slots currently open for admission.
    pub available_slots: usize,
}

/// Formats a remaining-time value as the `"3m 42s"` string the demo
/// frontend displays.
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}
