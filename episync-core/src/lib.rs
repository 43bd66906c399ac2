//! # Episync Core
//!
//! Watch-history reconciliation and batch-update engine.
//!
//! The engine turns a raw, possibly noisy stream of episode-watch events
//! from a streaming service into the minimal set of progress updates a
//! list-tracking service needs to catch up, then applies them in combined
//! requests:
//!
//! - [`progress`]: folds watch events into one "highest fully-watched
//!   episode" fact per series
//! - [`lookup`]: resolves series titles against the remote catalog in a
//!   single aliased query
//! - [`planner`]: computes forward-only deltas between local and remote
//!   progress
//! - [`update`]: applies the plan in aliased batch mutations and reports
//!   one result per item
//! - [`sync`]: the pipeline wiring the stages together
//!
//! Remote collaborators are abstracted behind the [`traits::HistorySource`]
//! and [`traits::ListService`] traits; concrete Crunchyroll and AniList
//! clients live in [`providers`], and an on-disk history cache decorator in
//! [`cache`].
//!
//! ## Example
//!
//! ```no_run
//! use episync_core::{
//!     providers::{AnilistClient, CrunchyrollProvider},
//!     sync::SyncEngine,
//! };
//!
//! async fn run() -> episync_core::Result<()> {
//!     let history = CrunchyrollProvider::new("cr-token", "cr-user");
//!     let anilist = AnilistClient::new("al-token");
//!     let report = SyncEngine::new(history, anilist).run().await?;
//!     println!("{} series updated", report.updated_count());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// On-disk caching decorator for history sources
pub mod cache;
/// Error types and error handling utilities
pub mod error;
/// Combined GraphQL request/response envelope types
pub mod graphql;
/// Raw watch-event model
pub mod history;
/// Remote lookup batcher (aliased combined queries)
pub mod lookup;
/// Delta planner
pub mod planner;
/// Series progress reducer
pub mod progress;
/// Concrete remote service clients
pub mod providers;
/// The synchronization pipeline and its run report
pub mod sync;
/// Collaborator seams
pub mod traits;
/// Update batcher (aliased combined mutations)
pub mod update;

pub use error::{Result, SyncError};
pub use graphql::{CombinedResponse, GraphqlDocument, GraphqlError};
pub use history::WatchEvent;
pub use lookup::{LookupBatch, RemoteMediaMatch};
pub use planner::UpdatePlanItem;
pub use progress::{DEFAULT_COMPLETION_THRESHOLD, SeriesLocalProgress};
pub use sync::{SyncEngine, SyncPlan, SyncReport};
pub use traits::{HistorySource, ListService};
pub use update::{BatchFailure, UpdateResult};
