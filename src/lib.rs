//! # PubMed Herald
//!
//! A literature-watcher bot that polls a PubMed search-results page and
//! announces newly published articles on a microblog and over Telegram.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (ArticleRecord, PublishedEntry, etc.)
//! - [`fetch`]: Search-results page retrieval and scraping
//! - [`compose`]: Length-bounded post composition
//! - [`post`]: Microblog publishing
//! - [`notify`]: Telegram notifications
//! - [`store`]: Persistent publication history and cycle markers
//! - [`schedule`]: Poll-cycle pacing
//! - [`coordinator`]: The publish cycle tying everything together
//! - [`migrate`]: Legacy state backfill
//! - [`config`]: Configuration management

pub mod compose;
pub mod config;
pub mod coordinator;
pub mod fetch;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod post;
pub mod schedule;
pub mod store;

// Re-export commonly used types
pub use coordinator::{CoordinatorSettings, PublishCoordinator};
pub use models::ArticleRecord;
pub use store::Store;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
