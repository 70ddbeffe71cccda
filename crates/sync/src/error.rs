use snafu::Snafu;

use crate::poller::PollerState;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    #[snafu(display("enrichment lookup for '{identity}' failed on `{stage}`: {details}"))]
    LookupFailed {
        stage: &'static str,
        identity: String,
        details: String,
    },
    #[snafu(display("enrichment lookup for '{identity}' timed out after {timeout_ms}ms"))]
    LookupTimedOut {
        stage: &'static str,
        identity: String,
        timeout_ms: u64,
    },
    #[snafu(display("thread refresh failed on `{stage}`: {details}"))]
    RefreshFailed {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("thread poller cannot start from state {from:?}"))]
    PollerTransition {
        stage: &'static str,
        from: PollerState,
    },
}

impl SyncError {
    /// True for the per-identity lookup failures a reconciliation pass swallows.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::LookupFailed { .. } | Self::LookupTimedOut { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
