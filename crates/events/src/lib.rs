//! Document-change events and the search-index synchronisation service.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DocumentEvent`] -- a job or user document was written or deleted.
//! - [`IndexSync`] -- background service that mirrors those changes into
//!   the search index.

pub mod bus;
pub mod index_sync;

pub use bus::{DocumentChange, DocumentEvent, EventBus};
pub use index_sync::{IndexSync, SyncOutcome};
