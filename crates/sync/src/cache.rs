use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::types::{EnrichmentRecord, Identity, Revision};

pub type DecorationMap = HashMap<Identity, EnrichmentRecord>;

/// Immutable view of the cache at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecorationSnapshot {
    pub revision: Revision,
    pub entries: DecorationMap,
}

impl DecorationSnapshot {
    pub fn get(&self, identity: &Identity) -> Option<&EnrichmentRecord> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity → decoration map shared between readers and the reconciler.
///
/// Writes replace the whole snapshot, so readers only ever observe complete commits.
pub struct DecorationCache {
    inner: ArcSwap<DecorationSnapshot>,
}

impl DecorationCache {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(DecorationSnapshot::default()),
        }
    }

    pub fn get(&self, identity: &Identity) -> Option<EnrichmentRecord> {
        self.inner.load().get(identity).cloned()
    }

    pub fn snapshot(&self) -> Arc<DecorationSnapshot> {
        self.inner.load_full()
    }

    pub fn revision(&self) -> Revision {
        self.inner.load().revision
    }

    /// Replaces every entry in one swap and returns the new revision.
    pub fn set_all(&self, entries: DecorationMap) -> Revision {
        let previous = self.inner.rcu(|current| {
            Arc::new(DecorationSnapshot {
                revision: current.revision.next(),
                entries: entries.clone(),
            })
        });
        previous.revision.next()
    }

    /// Compare-and-swap read-modify-write.
    ///
    /// `merge` sees the live entries and returns the replacement, or `None` to leave the
    /// cache untouched. It is re-run if another commit lands in between, so it must be pure.
    pub fn update<F>(&self, mut merge: F) -> Option<Revision>
    where
        F: FnMut(&DecorationMap) -> Option<DecorationMap>,
    {
        loop {
            let current = self.inner.load_full();
            let entries = merge(&current.entries)?;
            let next = Arc::new(DecorationSnapshot {
                revision: current.revision.next(),
                entries,
            });
            let revision = next.revision;
            let previous = self.inner.compare_and_swap(&current, next);
            if Arc::ptr_eq(&*previous, &current) {
                return Some(revision);
            }
        }
    }
}

impl Default for DecorationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> DecorationMap {
        pairs
            .iter()
            .map(|(id, marker)| (Identity::from(*id), EnrichmentRecord::new(*marker)))
            .collect()
    }

    #[test]
    fn set_all_replaces_wholesale_and_bumps_revision() {
        let cache = DecorationCache::new();
        assert_eq!(cache.revision(), Revision::new(0));

        let revision = cache.set_all(entries(&[("u1", "🙂"), ("u2", "🐱")]));
        assert_eq!(revision, Revision::new(1));

        cache.set_all(entries(&[("u3", "🚀")]));
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.revision, Revision::new(2));
        assert_eq!(snapshot.len(), 1);
        assert!(cache.get(&Identity::from("u1")).is_none());
        assert_eq!(
            cache.get(&Identity::from("u3")),
            Some(EnrichmentRecord::new("🚀"))
        );
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_commits() {
        let cache = DecorationCache::new();
        cache.set_all(entries(&[("u1", "🙂")]));
        let before = cache.snapshot();

        cache.set_all(DecorationMap::new());

        assert!(before.contains(&Identity::from("u1")));
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn update_returning_none_leaves_revision_untouched() {
        let cache = DecorationCache::new();
        cache.set_all(entries(&[("u1", "🙂")]));

        assert_eq!(cache.update(|_| None), None);
        assert_eq!(cache.revision(), Revision::new(1));

        let revision = cache.update(|live| {
            let mut next = live.clone();
            next.insert(Identity::from("u2"), EnrichmentRecord::new("🐱"));
            Some(next)
        });
        assert_eq!(revision, Some(Revision::new(2)));
        assert_eq!(cache.snapshot().len(), 2);
    }
}
