//! # inspect-rs
//!
//! Dispatches item inspect requests over a pool of game-coordinator
//! sessions, each serving one request at a time under a per-session rate
//! limit.
//!
//! Provides the session workers and dispatcher (`pool`), the fixed-width
//! item identity codec (`identity`), a dedup cache keyed by inspect link
//! (`cache`), and OpenTelemetry observability.

pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod identity;
pub mod model;
pub mod pool;
pub mod session;
pub mod telemetry;
