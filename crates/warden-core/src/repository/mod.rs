//! Port definitions.
//!
//! These traits define the data source and storage interfaces that the
//! infrastructure layer (warden-infra) implements. The core crate never
//! depends on any specific HTTP client or storage technology.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

pub mod data_source;
pub mod remote;
pub mod store;
