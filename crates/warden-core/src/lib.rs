//! Failure-classification engine and disable/restore lifecycle for Warden.
//!
//! This crate defines the "ports" (data source and store traits) that the
//! infrastructure layer implements, plus the logic that runs on top of them:
//! metric computation, classification, issue detection, the analysis
//! aggregator, and the lifecycle manager. It depends only on
//! `warden-types` -- never on `warden-infra` or any HTTP/filesystem crate.

pub mod analysis;
pub mod audit;
pub mod classifier;
pub mod issues;
pub mod lifecycle;
pub mod metrics;
pub mod repository;
