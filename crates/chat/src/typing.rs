use std::collections::HashMap;
use std::time::Duration;

use huddle_sync::{Identity, ParticipantRecord};
use tokio::time::Instant;

use crate::settings::state::DEFAULT_TYPING_WINDOW_MS;

#[derive(Debug, Clone)]
struct TypingSignal {
    display_name: String,
    received_at: Instant,
}

/// Who is typing right now, from the SDK's typing notifications.
#[derive(Debug, Clone)]
pub struct TypingTracker {
    local: Identity,
    window: Duration,
    signals: HashMap<Identity, TypingSignal>,
}

impl TypingTracker {
    pub fn new(local: Identity) -> Self {
        Self::with_window(local, Duration::from_millis(DEFAULT_TYPING_WINDOW_MS))
    }

    pub fn with_window(local: Identity, window: Duration) -> Self {
        Self {
            local,
            window,
            signals: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Signals from the local participant are ignored.
    pub fn record(&mut self, participant: &ParticipantRecord, received_at: Instant) {
        if participant.id == self.local {
            return;
        }
        self.signals.insert(
            participant.id.clone(),
            TypingSignal {
                display_name: participant.display_name.clone(),
                received_at,
            },
        );
    }

    /// Display names of active typers, earliest signal first.
    pub fn active_names(&self, now: Instant) -> Vec<&str> {
        let mut active: Vec<&TypingSignal> = self
            .signals
            .values()
            .filter(|signal| self.is_active(signal, now))
            .collect();
        active.sort_by_key(|signal| signal.received_at);
        active
            .into_iter()
            .map(|signal| signal.display_name.as_str())
            .collect()
    }

    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.signals
            .retain(|_, signal| now.saturating_duration_since(signal.received_at) < window);
    }

    /// The indicator's two spans: the list of names and the verb.
    pub fn render(&self, now: Instant) -> (String, String) {
        let names = self.active_names(now);
        (
            typing_indicator_list(&names),
            typing_indicator_verb(names.len()).to_string(),
        )
    }

    fn is_active(&self, signal: &TypingSignal, now: Instant) -> bool {
        now.saturating_duration_since(signal.received_at) < self.window
    }
}

pub fn typing_indicator_list(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} and {second}"),
        [first, second, third] => format!("{first}, {second} and {third}"),
        [first, second, rest @ ..] => format!("{first}, {second} and {} others", rest.len()),
    }
}

pub fn typing_indicator_verb(count: usize) -> &'static str {
    match count {
        0 => "",
        1 => " is typing...",
        _ => " are typing...",
    }
}
