#![deny(unsafe_code)]

//! Participant decoration sync and thread polling for the huddle chat client.
//!
//! [`ChatStore`] is the shared state, [`RosterReconciler`] keeps its decoration cache in
//! line with its roster, [`ReconcileDriver`] runs the reconciler on every change and
//! [`ThreadPoller`] refreshes the thread on a fixed interval.

pub mod cache;
pub mod driver;
pub mod error;
pub mod poller;
pub mod reconciler;
pub mod resolver;
pub mod store;
pub mod types;

pub use cache::{DecorationCache, DecorationMap, DecorationSnapshot};
pub use driver::ReconcileDriver;
pub use error::{SyncError, SyncResult};
pub use poller::{DEFAULT_POLL_INTERVAL, PollerState, ThreadClient, ThreadPoller};
pub use reconciler::{
    DEFAULT_EVICT_AFTER_SNAPSHOTS, PassOutcome, PassReport, ReconcileConfig, RosterReconciler,
    SkipReason, SnapshotKey,
};
pub use resolver::{
    BoxFuture, DEFAULT_LOOKUP_TIMEOUT, EnrichmentResolver, EnrichmentSource,
    StaticEnrichmentSource,
};
pub use store::{ChatStore, StoreRevisions};
pub use types::{
    EnrichmentRecord, Identity, ParticipantRecord, PassId, Revision, RosterSnapshot,
    ThreadSnapshot,
};
