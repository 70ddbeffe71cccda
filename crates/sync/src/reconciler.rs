use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;

use crate::cache::DecorationMap;
use crate::resolver::EnrichmentResolver;
use crate::store::ChatStore;
use crate::types::{EnrichmentRecord, Identity, PassId, Revision};

/// Default number of consecutive roster snapshots an identity may be missing from before
/// its decoration is dropped.
pub const DEFAULT_EVICT_AFTER_SNAPSHOTS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// `None` keeps decorations of departed participants forever.
    pub evict_after_snapshots: Option<u32>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            evict_after_snapshots: Some(DEFAULT_EVICT_AFTER_SNAPSHOTS),
        }
    }
}

/// Roster and cache revisions a pass was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub roster: Revision,
    pub decorations: Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another pass for the same snapshot is still running.
    InFlight,
    /// The last settled pass already covered this snapshot.
    AlreadySettled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Committed(Revision),
    Unchanged,
    /// A newer pass started; only entries still missing from the cache were filled in.
    Superseded(Option<Revision>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub pass: Option<PassId>,
    pub key: SnapshotKey,
    pub looked_up: usize,
    pub resolved: usize,
    pub failed: usize,
    pub evicted: usize,
    pub outcome: PassOutcome,
}

impl PassReport {
    fn skipped(key: SnapshotKey, reason: SkipReason) -> Self {
        Self {
            pass: None,
            key,
            looked_up: 0,
            resolved: 0,
            failed: 0,
            evicted: 0,
            outcome: PassOutcome::Skipped(reason),
        }
    }

    pub fn committed(&self) -> bool {
        matches!(
            self.outcome,
            PassOutcome::Committed(_) | PassOutcome::Superseded(Some(_))
        )
    }
}

#[derive(Debug, Default)]
struct PassLedger {
    next_pass: u64,
    latest: Option<PassId>,
    in_flight: HashSet<SnapshotKey>,
    settled: Option<SnapshotKey>,
    pending: HashSet<Identity>,
    absences: HashMap<Identity, u32>,
    counted_roster: Option<Revision>,
}

/// Keeps the store's decoration cache eventually consistent with its roster.
pub struct RosterReconciler {
    store: Arc<ChatStore>,
    resolver: EnrichmentResolver,
    config: ReconcileConfig,
    ledger: Mutex<PassLedger>,
}

/// Releases a pass's ledger claims even if the pass future is dropped mid-lookup.
struct PassClaim<'a> {
    ledger: &'a Mutex<PassLedger>,
    key: SnapshotKey,
    identities: Vec<Identity>,
}

impl Drop for PassClaim<'_> {
    fn drop(&mut self) {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.in_flight.remove(&self.key);
        for identity in &self.identities {
            ledger.pending.remove(identity);
        }
    }
}

impl RosterReconciler {
    pub fn new(store: Arc<ChatStore>, resolver: EnrichmentResolver) -> Self {
        Self::with_config(store, resolver, ReconcileConfig::default())
    }

    pub fn with_config(
        store: Arc<ChatStore>,
        resolver: EnrichmentResolver,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
            ledger: Mutex::new(PassLedger::default()),
        }
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    pub fn latest_pass(&self) -> Option<PassId> {
        self.lock_ledger().latest
    }

    /// Runs one reconciliation pass against the store's current roster and cache.
    pub async fn reconcile(&self) -> PassReport {
        let roster = self.store.roster();
        let cache = self.store.decorations();
        let key = SnapshotKey {
            roster: roster.revision,
            decorations: cache.revision,
        };

        let (pass, undecorated, evictions) = {
            let mut ledger = self.lock_ledger();
            if ledger.in_flight.contains(&key) {
                tracing::debug!(
                    roster = %key.roster,
                    decorations = %key.decorations,
                    "pass already in flight"
                );
                return PassReport::skipped(key, SkipReason::InFlight);
            }
            if ledger.settled == Some(key) {
                tracing::debug!(
                    roster = %key.roster,
                    decorations = %key.decorations,
                    "snapshot already reconciled"
                );
                return PassReport::skipped(key, SkipReason::AlreadySettled);
            }

            ledger.next_pass += 1;
            let pass = PassId::new(ledger.next_pass);
            ledger.latest = Some(pass);
            ledger.in_flight.insert(key);

            let identities = roster.identities();
            let undecorated = identities
                .iter()
                .filter(|identity| !cache.contains(identity))
                .filter(|identity| !ledger.pending.contains(*identity))
                .cloned()
                .collect::<Vec<_>>();
            ledger.pending.extend(undecorated.iter().cloned());

            let evictions = if roster.is_empty() {
                Vec::new()
            } else {
                self.account_absences(
                    &mut ledger,
                    key.roster,
                    &identities,
                    cache.entries.keys(),
                )
            };

            (pass, undecorated, evictions)
        };
        let claim = PassClaim {
            ledger: &self.ledger,
            key,
            identities: undecorated.clone(),
        };

        let lookups = undecorated
            .iter()
            .map(|identity| async move { (identity, self.resolver.resolve(identity).await) });
        let results = join_all(lookups).await;

        let mut resolved = Vec::new();
        let mut failed = 0;
        for (identity, result) in results {
            match result {
                Ok(Some(record)) => resolved.push((identity.clone(), record)),
                Ok(None) => {
                    tracing::debug!(pass = %pass, identity = %identity, "no enrichment record");
                }
                Err(error) => {
                    failed += 1;
                    tracing::warn!(
                        pass = %pass,
                        identity = %identity,
                        error = %error,
                        "enrichment lookup failed; retrying on next pass"
                    );
                }
            }
        }

        let superseded = self.latest_pass() != Some(pass);
        let outcome = if superseded {
            PassOutcome::Superseded(self.fill_missing(&resolved))
        } else if resolved.is_empty() && evictions.is_empty() {
            PassOutcome::Unchanged
        } else {
            match self.merge(&resolved, &evictions) {
                Some(revision) => PassOutcome::Committed(revision),
                None => PassOutcome::Unchanged,
            }
        };

        drop(claim);
        {
            let mut ledger = self.lock_ledger();
            if let PassOutcome::Committed(_) = outcome {
                for identity in &evictions {
                    ledger.absences.remove(identity);
                }
            }
            if !superseded {
                ledger.settled = Some(key);
            }
        }

        let report = PassReport {
            pass: Some(pass),
            key,
            looked_up: undecorated.len(),
            resolved: resolved.len(),
            failed,
            evicted: if matches!(outcome, PassOutcome::Committed(_)) {
                evictions.len()
            } else {
                0
            },
            outcome,
        };
        if report.committed() {
            tracing::info!(
                pass = %pass,
                looked_up = report.looked_up,
                resolved = report.resolved,
                evicted = report.evicted,
                superseded,
                "committed decorations"
            );
        } else {
            tracing::debug!(
                pass = %pass,
                looked_up = report.looked_up,
                failed,
                superseded,
                "pass left cache unchanged"
            );
        }
        report
    }

    /// Updates absence counters once per roster revision and returns identities due for eviction.
    fn account_absences<'a>(
        &self,
        ledger: &mut PassLedger,
        roster_revision: Revision,
        present: &[Identity],
        cached: impl Iterator<Item = &'a Identity>,
    ) -> Vec<Identity> {
        let Some(threshold) = self.config.evict_after_snapshots else {
            return Vec::new();
        };

        let cached = cached.collect::<Vec<_>>();
        if ledger.counted_roster != Some(roster_revision) {
            ledger.counted_roster = Some(roster_revision);
            for identity in present {
                ledger.absences.remove(identity);
            }
            for identity in &cached {
                if !present.contains(identity) {
                    *ledger.absences.entry((*identity).clone()).or_default() += 1;
                }
            }
        }

        cached
            .into_iter()
            .filter(|identity| {
                ledger
                    .absences
                    .get(*identity)
                    .is_some_and(|count| *count >= threshold)
            })
            .cloned()
            .collect()
    }

    fn merge(
        &self,
        resolved: &[(Identity, EnrichmentRecord)],
        evictions: &[Identity],
    ) -> Option<Revision> {
        self.store.commit_decorations_with(|live| {
            let mut next = live.clone();
            for identity in evictions {
                next.remove(identity);
            }
            for (identity, record) in resolved {
                next.insert(identity.clone(), record.clone());
            }
            (next != *live).then_some(next)
        })
    }

    fn fill_missing(&self, resolved: &[(Identity, EnrichmentRecord)]) -> Option<Revision> {
        if resolved.is_empty() {
            return None;
        }
        self.store.commit_decorations_with(|live| {
            let missing = resolved
                .iter()
                .filter(|(identity, _)| !live.contains_key(identity))
                .collect::<Vec<_>>();
            if missing.is_empty() {
                return None;
            }
            let mut next: DecorationMap = live.clone();
            for (identity, record) in missing {
                next.insert(identity.clone(), record.clone());
            }
            Some(next)
        })
    }

    fn lock_ledger(&self) -> MutexGuard<'_, PassLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
