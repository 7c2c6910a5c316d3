//! Core types and error definitions for the Memdemo backend.
//!
//! This crate provides the foundational types shared across all Memdemo
//! crates: the unified error enum, the session key-mode tier, and the
//! dialogue unit fed into the memory engine at bootstrap.
//!
//! # Main types
//!
//! - [`DemoError`] — Unified error enum for all Memdemo subsystems.
//! - [`DemoResult`] — Convenience alias for `Result<T, DemoError>`.
//! - [`KeyMode`] — Credential tier a session was created under.
//! - [`Dialogue`] — A single speaker/content line of bootstrap context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Error types ---

/// Top-level error type for the Memdemo backend.
///
/// The first seven variants are the typed outcomes of the session
/// lifecycle API; the transport layer maps each to a distinct status
/// code family so clients can tell bad input, not-found/gone, resource
/// exhaustion, and internal failure apart.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Caller-supplied input failed validation (e.g. missing credential
    /// in bring-your-own-key mode). Not retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operator-level setup problem, such as no server API key
    /// configured. Blocks every server-tier session until fixed.
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    /// The session pool is full. Transient; the caller should retry
    /// with backoff. Never retried internally.
    #[error("Server at capacity ({active}/{max} active sessions)")]
    CapacityExceeded {
        /// Live sessions at the time of rejection.
        active: usize,
        /// Configured concurrency maximum.
        max: usize,
    },

    /// The session identifier is unknown to the store.
    #[error("Session not found")]
    NotFound,

    /// The session existed but is past its absolute expiry. Detecting
    /// this removes the record as a side effect.
    #[error("Session expired")]
    Expired,

    /// The session's turn allowance is exhausted. The record remains
    /// queryable via status until it expires or is deleted.
    #[error("Maximum turns reached ({limit})")]
    QuotaExceeded {
        /// The turn limit the session was created with.
        limit: u32,
    },

    /// The delegated call into the memory engine failed or timed out.
    /// Does not consume a turn; the caller may retry the same message.
    #[error("Engine error: {0}")]
    Engine(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`DemoError`].
pub type DemoResult<T> = Result<T, DemoError>;

// --- Session tier ---

/// Which credential a session runs on. Fixed at creation; determines
/// the turn allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// The session uses the operator-configured API key (small quota).
    ServerKey,
    /// The caller supplied their own API key (larger quota).
    BringOwnKey,
}

// --- Bootstrap context ---

/// A single line of conversational context used to seed a session's
/// memory engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    /// 1-based position within the bootstrap context.
    pub dialogue_id: u32,
    /// Who said it.
    pub speaker: String,
    /// What was said.
    pub content: String,
    /// Optional original timestamp; the demo leaves this unset.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Dialogue {
    /// Creates a dialogue with no timestamp.
    pub fn new(dialogue_id: u32, speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            dialogue_id,
            speaker: speaker.into(),
            content: content.into(),
            timestamp: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_distinct() {
        let busy = DemoError::CapacityExceeded { active: 8, max: 8 };
        assert_eq!(busy.to_string(), "Server at capacity (8/8 active sessions)");
        assert_eq!(DemoError::Expired.to_string(), "Session expired");
        assert_eq!(
            DemoError::QuotaExceeded { limit: 2 }.to_string(),
            "Maximum turns reached (2)"
        );
    }

    #[test]
    fn key_mode_serde_round_trip() {
        let json = serde_json::to_string(&KeyMode::BringOwnKey).unwrap();
        assert_eq!(json, r#""bring_own_key""#);
        let back: KeyMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KeyMode::BringOwnKey);
    }

    #[test]
    fn dialogue_new_defaults() {
        let d = Dialogue::new(1, "Alice", "hello");
        assert_eq!(d.dialogue_id, 1);
        assert!(d.timestamp.is_none());
    }
}
