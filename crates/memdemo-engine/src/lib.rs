//! Memory engine and embedding seams for the Memdemo backend.
//!
//! The session core treats the memory/retrieval engine as an opaque
//! collaborator: something that can be bootstrapped from dialogue
//! context, asked a question, and released. This crate defines those
//! seams ([`MemoryEngine`], [`EngineFactory`], [`EmbeddingProvider`])
//! and ships OpenAI-API-backed implementations used by the demo binary.

/// Bootstrap context-text parsing into dialogues.
pub mod context;
/// Text embedding provider trait and OpenAI implementation.
pub mod embedding;
/// The memory engine seam consumed by the session core.
pub mod engine;
/// OpenAI chat-completions implementation of the engine seam.
pub mod openai;

pub use context::parse_context;
pub use embedding::{EmbeddingProvider, OpenAiEmbedding};
pub use engine::{EngineCredential, EngineFactory, MemoryEngine};
pub use openai::{OpenAiChatEngine, OpenAiEngineFactory};
