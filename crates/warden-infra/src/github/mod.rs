//! GitHub REST adapter.
//!
//! [`GitHubDataSource`] implements the core `DataSource` port; [`types`]
//! holds the wire structures it deserializes.

pub mod client;
pub mod types;

pub use client::GitHubDataSource;
