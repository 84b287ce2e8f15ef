//! # cjstore - submission store for CrowdJuke
//!
//! The submission store persists patron track requests per location and
//! assigns arrival order. This crate provides:
//!
//! - [`SubmissionStore`]: the store contract (insert with duplicate
//!   rejection, newest-first queries, retention-window listing, cleanup)
//! - [`MemoryStore`]: the in-process backend used by the server
//! - [`RemoteStore`]: a `reqwest` client of the CrowdJuke HTTP surface, for
//!   display sessions polling a remote deployment
//!
//! # Duplicate policy
//!
//! `insert` rejects a submission whose media ref is identical to the
//! location's *most recent* submission only. A track already sitting deeper
//! in the queue is deliberately not rejected; this is a store-level policy
//! choice, not a reconciler concern.
//!
//! # Example
//!
//! ```
//! use cjstore::{MemoryStore, NewSubmission, SubmissionStore};
//!
//! # #[tokio::main]
//! # async fn main() -> cjstore::Result<()> {
//! let store = MemoryStore::new(["dagapur"]);
//!
//! let track = store
//!     .insert(NewSubmission {
//!         location_id: "dagapur".into(),
//!         media_ref: "https://youtu.be/dQw4w9WgXcQ".into(),
//!         submitted_by: "Asha".into(),
//!     })
//!     .await?;
//!
//! let latest = store.fetch_latest("dagapur").await?;
//! assert_eq!(latest.map(|t| t.id), Some(track.id));
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod memory;
mod remote;

// Public re-exports
pub use api::{NewSubmission, SubmissionStore, SubmitRequest, SubmitResponse};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use remote::{RemoteStore, RemoteStoreBuilder};
