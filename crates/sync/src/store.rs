use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::cache::{DecorationCache, DecorationMap, DecorationSnapshot};
use crate::types::{
    EnrichmentRecord, Identity, ParticipantRecord, Revision, RosterSnapshot, ThreadSnapshot,
};

/// Latest revision of each store field, published on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreRevisions {
    pub roster: Revision,
    pub decorations: Revision,
    pub thread: Revision,
    /// Bumped each time the SDK reports a failure to load thread members.
    pub members_error: Revision,
}

/// Application state shared by the chat screen, the poller's SDK client and the reconciler.
///
/// Passed around as `Arc<ChatStore>`; there is no global instance.
pub struct ChatStore {
    roster: ArcSwap<RosterSnapshot>,
    decorations: DecorationCache,
    thread: ArcSwap<ThreadSnapshot>,
    removal_denied: AtomicBool,
    members_error: AtomicBool,
    revisions: watch::Sender<StoreRevisions>,
}

impl ChatStore {
    pub fn new() -> Self {
        let (revisions, _) = watch::channel(StoreRevisions::default());
        Self {
            roster: ArcSwap::from_pointee(RosterSnapshot::default()),
            decorations: DecorationCache::new(),
            thread: ArcSwap::from_pointee(ThreadSnapshot::default()),
            removal_denied: AtomicBool::new(false),
            members_error: AtomicBool::new(false),
            revisions,
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreRevisions> {
        self.revisions.subscribe()
    }

    pub fn revisions(&self) -> StoreRevisions {
        *self.revisions.borrow()
    }

    pub fn roster(&self) -> Arc<RosterSnapshot> {
        self.roster.load_full()
    }

    /// Publishes a fresh roster. Always bumps the revision, even for identical content,
    /// because every refresh is a new snapshot.
    pub fn set_roster(&self, participants: Vec<ParticipantRecord>) -> Revision {
        let previous = self.roster.rcu(|current| {
            Arc::new(RosterSnapshot {
                revision: current.revision.next(),
                participants: participants.clone(),
            })
        });
        let revision = previous.revision.next();
        self.revisions.send_modify(|revisions| revisions.roster = revision);
        revision
    }

    pub fn decorations(&self) -> Arc<DecorationSnapshot> {
        self.decorations.snapshot()
    }

    pub fn decoration(&self, identity: &Identity) -> Option<EnrichmentRecord> {
        self.decorations.get(identity)
    }

    /// The only write path into the decoration cache: replaces it in one commit.
    pub fn commit_decorations(&self, entries: DecorationMap) -> Revision {
        let revision = self.decorations.set_all(entries);
        self.publish_decorations(revision);
        revision
    }

    /// Commit computed against the live entries; see [`DecorationCache::update`].
    pub fn commit_decorations_with<F>(&self, merge: F) -> Option<Revision>
    where
        F: FnMut(&DecorationMap) -> Option<DecorationMap>,
    {
        let revision = self.decorations.update(merge)?;
        self.publish_decorations(revision);
        Some(revision)
    }

    pub fn thread(&self) -> Arc<ThreadSnapshot> {
        self.thread.load_full()
    }

    pub fn set_thread_topic(&self, topic: Option<String>) -> Revision {
        let previous = self.thread.rcu(|current| {
            Arc::new(ThreadSnapshot {
                revision: current.revision.next(),
                topic: topic.clone(),
            })
        });
        let revision = previous.revision.next();
        self.revisions.send_modify(|revisions| revisions.thread = revision);
        revision
    }

    pub fn flag_removal_denied(&self) {
        self.removal_denied.store(true, Ordering::SeqCst);
    }

    /// Returns whether a removal was denied since the last call, and clears the flag.
    pub fn take_removal_denied(&self) -> bool {
        self.removal_denied.swap(false, Ordering::SeqCst)
    }

    /// Raised by the thread client when the member list could not be loaded.
    pub fn flag_members_error(&self) {
        self.members_error.store(true, Ordering::SeqCst);
        self.revisions
            .send_modify(|revisions| revisions.members_error = revisions.members_error.next());
    }

    /// Returns whether a member-list failure was reported since the last call, and clears it.
    pub fn take_members_error(&self) -> bool {
        self.members_error.swap(false, Ordering::SeqCst)
    }

    fn publish_decorations(&self, revision: Revision) {
        self.revisions.send_modify(|revisions| {
            // Commits can race; never move the published revision backwards.
            if revision > revisions.decorations {
                revisions.decorations = revision;
            }
        });
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_roster_publish_is_a_new_revision() {
        let store = ChatStore::new();
        let roster = vec![ParticipantRecord::new("u1", "Ada")];

        let first = store.set_roster(roster.clone());
        let second = store.set_roster(roster);

        assert!(second > first);
        assert_eq!(store.roster().revision, second);
        assert_eq!(store.revisions().roster, second);
    }

    #[tokio::test]
    async fn subscribers_see_decoration_commits() {
        let store = ChatStore::new();
        let mut revisions = store.subscribe();

        let mut entries = DecorationMap::new();
        entries.insert(Identity::from("u1"), EnrichmentRecord::new("🙂"));
        let revision = store.commit_decorations(entries);

        revisions.changed().await.expect("store alive");
        assert_eq!(revisions.borrow_and_update().decorations, revision);
        assert_eq!(
            store.decoration(&Identity::from("u1")),
            Some(EnrichmentRecord::new("🙂"))
        );
    }

    #[test]
    fn removal_denied_flag_is_taken_once() {
        let store = ChatStore::new();
        assert!(!store.take_removal_denied());

        store.flag_removal_denied();
        assert!(store.take_removal_denied());
        assert!(!store.take_removal_denied());
    }

    #[tokio::test]
    async fn members_error_is_published_and_taken_once() {
        let store = ChatStore::new();
        let mut revisions = store.subscribe();
        assert!(!store.take_members_error());

        store.flag_members_error();

        revisions.changed().await.expect("store alive");
        assert_eq!(
            revisions.borrow_and_update().members_error,
            Revision::new(1)
        );
        assert!(store.take_members_error());
        assert!(!store.take_members_error());
    }

    #[test]
    fn thread_topic_updates_publish_revision() {
        let store = ChatStore::new();
        let revision = store.set_thread_topic(Some("Standup".to_string()));

        assert_eq!(store.thread().existing_topic(), Some("Standup"));
        assert_eq!(store.revisions().thread, revision);
    }
}
