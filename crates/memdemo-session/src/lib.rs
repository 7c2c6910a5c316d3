//! Bounded-capacity session lifecycle management.
//!
//! This crate is the core of the Memdemo backend: it admits chat
//! sessions under a fixed concurrency cap, enforces per-session turn
//! quotas, expires sessions on an absolute TTL, and sweeps stale
//! records both lazily on access and from a periodic background task.
//!
//! # Main types
//!
//! - [`SessionManager`] — The lifecycle API: create / chat / status / delete.
//! - [`SessionStore`] — In-memory record store with admission permits and sweep.
//! - [`Sweeper`] — Periodic background eviction task with explicit stop.
//! - [`SessionRecord`] — One live session and its engine handle.
//! - [`Clock`] — Time source abstraction so expiry is testable.

/// Time source abstraction.
pub mod clock;
/// Session lifecycle API.
pub mod manager;
/// Turn quota policy.
pub mod quota;
/// Session record and read-only projections.
pub mod session;
/// In-memory session store, admission control, and expiry sweep.
pub mod store;
/// Background sweeper task.
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{CreateParams, SessionManager};
pub use quota::{turn_limit, MAX_TURNS_BYOK, MAX_TURNS_SERVER_KEY};
pub use session::{
    format_remaining, ChatReply, CreatedSession, PoolStatus, SessionRecord, SessionStatus,
};
pub use store::{AdmissionPermit, PoolConfig, SessionStore};
pub use sweeper::Sweeper;
