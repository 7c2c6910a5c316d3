//! HTTP transport for the Memdemo backend.
//!
//! A thin axum layer over [`memdemo_session::SessionManager`]: each
//! route maps one lifecycle operation, and each typed lifecycle error
//! maps to a distinct status code family (bad input / not found or
//! gone / resource exhausted / internal failure).

/// Session route handlers and wire DTOs.
pub mod routes;
/// Router assembly and shared state.
pub mod server;

pub use server::{build_router, AppState};
