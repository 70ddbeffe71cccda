use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use huddle::error::{ParticipantRemovalDeniedSnafu, SettingsSnafu};
use huddle::settings::{ChatSettings, SettingsStore};
use huddle::{
    ChatResult, ChatScreen, MembersErrorHandler, ScreenServices, ThreadActions, TracingFocus,
    typing_indicator_list, typing_indicator_verb,
};
use huddle_sync::{
    BoxFuture, ChatStore, Identity, ParticipantRecord, StaticEnrichmentSource, SyncResult,
    ThreadClient,
};
use snafu::ResultExt;

const DEMO_RUN_TIME: Duration = Duration::from_millis(7_000);
const DEMO_VIEWPORT_WIDTH: u32 = 1_280;
const WRITE_SETTINGS_FLAG: &str = "--write-settings";

/// In-memory stand-in for the chat SDK: each refresh admits the next scripted participant.
struct SimulatedThread {
    store: Arc<ChatStore>,
    script: Vec<ParticipantRecord>,
    admitted: AtomicUsize,
}

impl SimulatedThread {
    fn new(store: Arc<ChatStore>, script: Vec<ParticipantRecord>) -> Self {
        Self {
            store,
            script,
            admitted: AtomicUsize::new(1),
        }
    }

    fn publish(&self) {
        let admitted = self.admitted.load(Ordering::SeqCst).min(self.script.len());
        self.store.set_roster(self.script[..admitted].to_vec());
    }
}

impl ThreadClient for SimulatedThread {
    fn refresh_thread<'a>(&'a self) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            self.admitted.fetch_add(1, Ordering::SeqCst);
            self.publish();
            Ok(())
        })
    }
}

impl ThreadActions for SimulatedThread {
    fn update_thread_topic<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            self.store.set_thread_topic(Some(topic.to_string()));
            Ok(())
        })
    }

    fn remove_participant<'a>(&'a self, identity: &'a Identity) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            ParticipantRemovalDeniedSnafu {
                stage: "simulated-remove-participant",
                identity: identity.to_string(),
            }
            .fail()
        })
    }
}

struct LogMembersError;

impl MembersErrorHandler for LogMembersError {
    fn on_members_error(&self) {
        tracing::error!("could not load thread members; leaving the chat");
    }
}

/// Writes the effective settings so they can be edited by hand.
fn write_settings(settings_store: &SettingsStore) -> ChatResult<()> {
    let settings = settings_store.settings();
    settings_store
        .update(ChatSettings::clone(&settings))
        .context(SettingsSnafu {
            stage: "write-settings",
        })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings_store = SettingsStore::load();
    if std::env::args().any(|arg| arg == WRITE_SETTINGS_FLAG)
        && let Err(error) = write_settings(&settings_store)
    {
        tracing::warn!(error = %error, "settings were not saved");
    }
    let settings = settings_store.settings();
    tracing::info!(path = ?settings_store.config_path(), "loaded settings");

    let store = ChatStore::shared();
    let thread = Arc::new(SimulatedThread::new(
        store.clone(),
        vec![
            ParticipantRecord::new("8:acs:me", "You"),
            ParticipantRecord::new("8:acs:ada", "Ada"),
            ParticipantRecord::new("8:acs:grace", "Grace"),
            ParticipantRecord::new("8:acs:alan", "Alan"),
        ],
    ));
    thread.publish();

    let enrichment = StaticEnrichmentSource::new()
        .with_record("8:acs:me", "🦀")
        .with_record("8:acs:ada", "🙂")
        .with_record("8:acs:alan", "🐱")
        .with_latency(Duration::from_millis(150));

    let local = Identity::from("8:acs:me");
    let mut screen = ChatScreen::new(
        ScreenServices {
            store: store.clone(),
            thread_client: thread.clone(),
            enrichment: Arc::new(enrichment),
            actions: thread.clone(),
            focus: Arc::new(TracingFocus),
            members_error: Arc::new(LogMembersError),
            local,
        },
        &settings,
    );

    if let Err(error) = screen.mount(DEMO_VIEWPORT_WIDTH) {
        tracing::error!(error = %error, "failed to mount chat screen");
        return;
    }

    screen.panel_mut().editor_mut().on_text_change("Design sync");
    if let Err(error) = screen.panel_mut().submit_topic().await {
        tracing::warn!(error = %error, "topic was not saved");
    }

    let now = tokio::time::Instant::now();
    for participant in store.roster().participants.iter() {
        screen.typing_mut().record(participant, now);
    }
    let names = screen.typing().active_names(now);
    tracing::info!(
        "{}{}",
        typing_indicator_list(&names),
        typing_indicator_verb(names.len())
    );

    if screen
        .panel()
        .remove_participant(&Identity::from("8:acs:ada"))
        .await
        .is_err()
        && let Some(notice) = screen.panel().take_removal_notice()
    {
        tracing::warn!("{notice}");
    }

    tokio::time::sleep(DEMO_RUN_TIME).await;

    tracing::info!(topic = %screen.panel().topic_text(), "thread topic");
    for member in screen.panel().members() {
        tracing::info!(
            identity = %member.identity,
            name = %member.display_name,
            avatar = %member.avatar,
            is_you = member.is_you,
            "member"
        );
    }

    screen.unmount();
}
