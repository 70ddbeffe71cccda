use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use snafu::OptionExt;

use crate::error::{LookupFailedSnafu, LookupTimedOutSnafu, SyncResult};
use crate::types::{EnrichmentRecord, Identity};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Remote lookup service that knows participants' decorations.
///
/// `Ok(None)` means the service has no record for the identity; `Err` is reserved for
/// lookups that could not complete.
pub trait EnrichmentSource: Send + Sync {
    fn fetch_enrichment<'a>(
        &'a self,
        identity: &'a Identity,
    ) -> BoxFuture<'a, SyncResult<Option<EnrichmentRecord>>>;
}

/// Wraps an [`EnrichmentSource`] with a bounded wait.
#[derive(Clone)]
pub struct EnrichmentResolver {
    source: Arc<dyn EnrichmentSource>,
    timeout: Duration,
}

impl EnrichmentResolver {
    pub fn new(source: Arc<dyn EnrichmentSource>) -> Self {
        Self::with_timeout(source, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn EnrichmentSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve(&self, identity: &Identity) -> SyncResult<Option<EnrichmentRecord>> {
        tokio::time::timeout(self.timeout, self.source.fetch_enrichment(identity))
            .await
            .ok()
            .context(LookupTimedOutSnafu {
                stage: "resolve-enrichment",
                identity: identity.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

/// In-memory [`EnrichmentSource`] with optional latency and injected failures.
#[derive(Debug, Clone, Default)]
pub struct StaticEnrichmentSource {
    records: HashMap<Identity, EnrichmentRecord>,
    latencies: HashMap<Identity, Duration>,
    default_latency: Duration,
    failing: HashSet<Identity>,
}

impl StaticEnrichmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(
        mut self,
        identity: impl Into<Identity>,
        marker: impl Into<String>,
    ) -> Self {
        self.records
            .insert(identity.into(), EnrichmentRecord::new(marker));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    pub fn with_identity_latency(
        mut self,
        identity: impl Into<Identity>,
        latency: Duration,
    ) -> Self {
        self.latencies.insert(identity.into(), latency);
        self
    }

    pub fn with_failure(mut self, identity: impl Into<Identity>) -> Self {
        self.failing.insert(identity.into());
        self
    }

    fn latency_for(&self, identity: &Identity) -> Duration {
        self.latencies
            .get(identity)
            .copied()
            .unwrap_or(self.default_latency)
    }
}

impl EnrichmentSource for StaticEnrichmentSource {
    fn fetch_enrichment<'a>(
        &'a self,
        identity: &'a Identity,
    ) -> BoxFuture<'a, SyncResult<Option<EnrichmentRecord>>> {
        Box::pin(async move {
            let latency = self.latency_for(identity);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            if self.failing.contains(identity) {
                return LookupFailedSnafu {
                    stage: "static-source-fetch",
                    identity: identity.to_string(),
                    details: "injected transport failure".to_string(),
                }
                .fail();
            }

            Ok(self.records.get(identity).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[tokio::test]
    async fn absent_record_is_not_an_error() {
        let resolver = EnrichmentResolver::new(Arc::new(
            StaticEnrichmentSource::new().with_record("u1", "🙂"),
        ));

        assert_eq!(
            resolver.resolve(&Identity::from("u1")).await.ok().flatten(),
            Some(EnrichmentRecord::new("🙂"))
        );
        assert!(matches!(
            resolver.resolve(&Identity::from("u2")).await,
            Ok(None)
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_a_lookup_failure() {
        let resolver =
            EnrichmentResolver::new(Arc::new(StaticEnrichmentSource::new().with_failure("u1")));

        let error = resolver
            .resolve(&Identity::from("u1"))
            .await
            .expect_err("injected failure");
        assert!(error.is_lookup_failure());
        assert!(matches!(error, SyncError::LookupFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out() {
        let source = StaticEnrichmentSource::new()
            .with_record("u1", "🙂")
            .with_latency(Duration::from_secs(30));
        let resolver =
            EnrichmentResolver::with_timeout(Arc::new(source), Duration::from_millis(250));

        let error = resolver
            .resolve(&Identity::from("u1"))
            .await
            .expect_err("lookup should time out");
        assert!(error.is_lookup_failure());
        assert!(matches!(
            error,
            SyncError::LookupTimedOut { timeout_ms: 250, .. }
        ));
    }
}
