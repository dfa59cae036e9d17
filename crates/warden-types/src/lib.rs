//! Shared domain types for Warden.
//!
//! This crate contains the domain types used across the Warden workspace:
//! runs and workflow descriptors fetched from a CI provider, analysis
//! snapshots, the disabled-workflow manifest, audit log entries, the
//! configuration struct, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod analysis;
pub mod audit;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod run;
