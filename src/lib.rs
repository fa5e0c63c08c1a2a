//! Board archival: cold storage for kanban boards.
//!
//! This crate moves a board, with its workflow states, tasks, comments and
//! memberships, out of the relational store into a JSON snapshot blob, and
//! rebuilds it from that blob on request.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: board aggregate, snapshot document and state key remapping
//! - **Ports**: relational store, blob store and job-status contracts
//! - **Adapters**: in-memory, Postgres and filesystem implementations
//!
//! # Modules
//!
//! - [`archival`]: archive and restore engines plus the message dispatcher
//! - [`config`]: worker settings from the environment or a JSON file
//! - [`telemetry`]: tracing subscriber installation

pub mod archival;
pub mod config;
pub mod telemetry;
