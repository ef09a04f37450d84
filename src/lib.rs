//! Warden - a rule-based reverse-proxy web application firewall.
//!
//! Warden sits in-path between clients and an origin service. Every request
//! is checked against an ephemeral and a persistent IP blocklist, scored
//! against a mutable set of regex rules, logged, and then either rejected
//! with a 403 or forwarded through a pooled upstream client.
//!
//! # Architecture
//! The crate follows a **hexagonal architecture**: business logic lives in
//! `core` (inspection engine, decision pipeline, realtime fan-out), the
//! `ports` module defines the trait seams (rule store, blocklists, attack
//! log store, upstream client), and `adapters` provides the Postgres, Redis,
//! reqwest, and axum implementations. End users should prefer the re-exports
//! below over reaching into internal modules directly.
//!
//! # Error Handling
//! Fallible APIs return `eyre::Result<T>` or a domain-specific error type at
//! the ports. The pipeline fails open when the ephemeral store is down and
//! fails the request when the persistent store is down.
//!
//! # Concurrency
//! The only shared mutable in-process collection is the realtime subscriber
//! set, which lives behind a mutex in [`core::LogFanout`]. Rules and
//! blocklists are shared through the backing store; every request re-reads
//! them, so admin mutations take effect on the next request.

pub mod adapters;
pub mod config;
pub mod core;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub use crate::{
    adapters::{AppState, build_router},
    config::Settings,
    core::{LogFanout, LogRecorder, RequestPipeline},
    utils::GracefulShutdown,
};
