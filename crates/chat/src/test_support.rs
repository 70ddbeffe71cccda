use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use huddle_sync::{BoxFuture, ChatStore, Identity, ParticipantRecord, SyncResult, ThreadClient};

use crate::actions::{FocusSink, MembersErrorHandler, ThreadActions};
use crate::error::{ChatResult, ParticipantRemovalDeniedSnafu, ThreadActionSnafu};

#[derive(Default)]
struct ActionLog {
    topics: Mutex<Vec<String>>,
    removals: Mutex<Vec<Identity>>,
}

/// Thread actions double; clones share one log.
#[derive(Clone, Default)]
pub struct RecordingActions {
    log: Arc<ActionLog>,
    topic_latency: Duration,
    fail_topics: bool,
    deny_removals: bool,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic_latency(mut self, latency: Duration) -> Self {
        self.topic_latency = latency;
        self
    }

    pub fn failing_topic_updates(mut self) -> Self {
        self.fail_topics = true;
        self
    }

    pub fn denying_removals(mut self) -> Self {
        self.deny_removals = true;
        self
    }

    pub fn topics(&self) -> Vec<String> {
        self.log.topics.lock().expect("topics lock").clone()
    }

    pub fn removals(&self) -> Vec<Identity> {
        self.log.removals.lock().expect("removals lock").clone()
    }
}

impl ThreadActions for RecordingActions {
    fn update_thread_topic<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            tokio::time::sleep(self.topic_latency).await;
            if self.fail_topics {
                return ThreadActionSnafu {
                    stage: "recording-actions",
                    action: "update_thread_topic",
                    details: "thread is read-only",
                }
                .fail();
            }
            self.log
                .topics
                .lock()
                .expect("topics lock")
                .push(topic.to_string());
            Ok(())
        })
    }

    fn remove_participant<'a>(&'a self, identity: &'a Identity) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            if self.deny_removals {
                return ParticipantRemovalDeniedSnafu {
                    stage: "recording-actions",
                    identity: identity.to_string(),
                }
                .fail();
            }
            self.log
                .removals
                .lock()
                .expect("removals lock")
                .push(identity.clone());
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct RecordingFocus {
    requests: Mutex<Vec<String>>,
}

impl RecordingFocus {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("focus lock").clone()
    }
}

impl FocusSink for RecordingFocus {
    fn focus(&self, control_id: &str) {
        self.requests
            .lock()
            .expect("focus lock")
            .push(control_id.to_string());
    }
}

#[derive(Default)]
pub struct CountingErrorHandler {
    calls: AtomicUsize,
}

impl CountingErrorHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MembersErrorHandler for CountingErrorHandler {
    fn on_members_error(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Thread client that republishes a fixed roster on every refresh.
pub struct RosterThreadClient {
    store: Arc<ChatStore>,
    roster: Vec<ParticipantRecord>,
    members_fail: bool,
    refreshes: AtomicUsize,
}

impl RosterThreadClient {
    pub fn new(store: Arc<ChatStore>, roster: Vec<ParticipantRecord>) -> Arc<Self> {
        Self::build(store, roster, false)
    }

    /// Every refresh reports that the member list could not be loaded.
    pub fn failing_members(store: Arc<ChatStore>) -> Arc<Self> {
        Self::build(store, Vec::new(), true)
    }

    fn build(
        store: Arc<ChatStore>,
        roster: Vec<ParticipantRecord>,
        members_fail: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            roster,
            members_fail,
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl ThreadClient for RosterThreadClient {
    fn refresh_thread<'a>(&'a self) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.members_fail {
                self.store.flag_members_error();
            } else {
                self.store.set_roster(self.roster.clone());
            }
            Ok(())
        })
    }
}
