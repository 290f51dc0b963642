//! Two-way sync between Asana tasks and GitHub issues.
//!
//! - [`item`] pairs tasks with issues by issue number and decides which side wins
//! - [`comment`] does the same for stories and issue comments of one pair
//! - [`exec`] applies the resulting [`ops`] to both services
//! - [`engine`] drives whole passes and keeps the [`cache`] of watermarks
//!
//! # Example
//!
//! ```ignore
//! use tracksync::config::load_config;
//! use tracksync::service::{AsanaClient, GitHubClient};
//! use tracksync::sync::{SyncCache, Syncer};
//!
//! let config = load_config(None)?;
//! let syncer = Syncer::new(
//!     AsanaClient::new(&config)?,
//!     GitHubClient::new(&config)?,
//!     SyncCache::load(config.cache_path()?)?,
//!     &config,
//! )?;
//! let summary = syncer.sync().await;
//! for line in &summary.log {
//!     println!("{line}");
//! }
//! ```

pub mod cache;
pub mod comment;
pub mod engine;
pub mod exec;
pub mod item;
pub mod log;
pub mod ops;

pub use cache::SyncCache;
pub use comment::diff_comments;
pub use engine::{ProjectReport, SyncSettings, SyncSummary, Syncer};
pub use exec::{ExecReport, OpRecord, Outcome, exec_comment_ops, exec_item_ops};
pub use item::diff_items;
pub use ops::{ChildPair, CommentOps, ItemOps, Ops, SideOps, Update};
