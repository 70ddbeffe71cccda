use std::sync::Arc;

use huddle_sync::{
    ChatStore, EnrichmentResolver, EnrichmentSource, Identity, ReconcileDriver, RosterReconciler,
    ThreadClient, ThreadPoller,
};
use snafu::ResultExt;
use tokio::task::JoinHandle;

use crate::actions::{FocusSink, MembersErrorHandler, SENDBOX_CONTROL, ThreadActions};
use crate::error::{ChatResult, LifecycleSnafu};
use crate::panel::{SidePane, SidePanel};
use crate::settings::ChatSettings;
use crate::typing::TypingTracker;

/// Collaborators a chat screen is wired to.
pub struct ScreenServices {
    pub store: Arc<ChatStore>,
    pub thread_client: Arc<dyn ThreadClient>,
    pub enrichment: Arc<dyn EnrichmentSource>,
    pub actions: Arc<dyn ThreadActions>,
    pub focus: Arc<dyn FocusSink>,
    pub members_error: Arc<dyn MembersErrorHandler>,
    pub local: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounted,
    Torn,
}

/// The joined-chat view: owns the background work that lives as long as it is mounted.
pub struct ChatScreen {
    store: Arc<ChatStore>,
    focus: Arc<dyn FocusSink>,
    members_error: Arc<dyn MembersErrorHandler>,
    reconciler: Arc<RosterReconciler>,
    poller: ThreadPoller,
    driver: Option<ReconcileDriver>,
    error_watch: Option<JoinHandle<()>>,
    panel: SidePanel,
    typing: TypingTracker,
    people_pane_min_width: u32,
    state: MountState,
}

impl ChatScreen {
    pub fn new(services: ScreenServices, settings: &ChatSettings) -> Self {
        let ScreenServices {
            store,
            thread_client,
            enrichment,
            actions,
            focus,
            members_error,
            local,
        } = services;

        let resolver = EnrichmentResolver::with_timeout(enrichment, settings.lookup_timeout());
        let reconciler = Arc::new(RosterReconciler::with_config(
            store.clone(),
            resolver,
            settings.reconcile_config(),
        ));
        let poller = ThreadPoller::with_interval(thread_client, settings.poll_interval());
        let panel = SidePanel::new(
            store.clone(),
            actions,
            focus.clone(),
            local.clone(),
            settings.max_topic_length,
        );
        let typing = TypingTracker::with_window(local, settings.typing_window());

        Self {
            store,
            focus,
            members_error,
            reconciler,
            poller,
            driver: None,
            error_watch: None,
            panel,
            typing,
            people_pane_min_width: settings.people_pane_min_width,
            state: MountState::Unmounted,
        }
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    pub fn panel(&self) -> &SidePanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut SidePanel {
        &mut self.panel
    }

    pub fn typing(&self) -> &TypingTracker {
        &self.typing
    }

    pub fn typing_mut(&mut self) -> &mut TypingTracker {
        &mut self.typing
    }

    /// Opens the default pane, focuses the send box and starts polling and reconciliation.
    ///
    /// While mounted, each member-list failure the thread client reports is handed to the
    /// [`MembersErrorHandler`] once.
    ///
    /// Must be called from within a tokio runtime. A torn-down screen cannot be mounted
    /// again.
    pub fn mount(&mut self, viewport_width: u32) -> ChatResult<()> {
        self.poller.start().context(LifecycleSnafu {
            stage: "mount-start-poller",
        })?;

        self.panel.set_pane(SidePane::for_viewport(
            viewport_width,
            self.people_pane_min_width,
        ));
        self.focus.focus(SENDBOX_CONTROL);
        self.driver = Some(ReconcileDriver::spawn(self.reconciler.clone()));
        self.error_watch = Some(tokio::spawn(watch_members_error(
            self.store.clone(),
            self.members_error.clone(),
        )));
        self.state = MountState::Mounted;
        tracing::info!(
            viewport_width,
            pane = ?self.panel.pane(),
            "chat screen mounted"
        );
        Ok(())
    }

    /// Stops the poller and the reconcile driver. Idempotent.
    pub fn unmount(&mut self) {
        if self.state == MountState::Torn {
            return;
        }

        self.poller.stop();
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
        }
        if let Some(error_watch) = self.error_watch.take() {
            error_watch.abort();
        }
        self.state = MountState::Torn;
        tracing::info!("chat screen unmounted");
    }
}

impl Drop for ChatScreen {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn watch_members_error(store: Arc<ChatStore>, handler: Arc<dyn MembersErrorHandler>) {
    let mut revisions = store.subscribe();
    loop {
        if store.take_members_error() {
            tracing::warn!("thread members could not be loaded");
            handler.on_members_error();
        }
        if revisions.changed().await.is_err() {
            break;
        }
    }
}
