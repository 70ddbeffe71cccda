use huddle_sync::{BoxFuture, Identity};

use crate::error::ChatResult;

pub const SENDBOX_CONTROL: &str = "sendbox";
pub const FOCUS_BUTTON_CONTROL: &str = "focusButton";

/// Thread mutations the side panel asks the chat SDK to perform.
///
/// Implementations report a throttled removal as [`ChatError::ParticipantRemovalDenied`].
///
/// [`ChatError::ParticipantRemovalDenied`]: crate::error::ChatError::ParticipantRemovalDenied
pub trait ThreadActions: Send + Sync {
    fn update_thread_topic<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, ChatResult<()>>;

    fn remove_participant<'a>(&'a self, identity: &'a Identity) -> BoxFuture<'a, ChatResult<()>>;
}

/// Moves keyboard focus to a named control of the host view.
pub trait FocusSink: Send + Sync {
    fn focus(&self, control_id: &str);
}

/// Focus sink for headless hosts; it only records the request in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFocus;

impl FocusSink for TracingFocus {
    fn focus(&self, control_id: &str) {
        tracing::debug!(control = control_id, "focus requested");
    }
}

/// Host reaction to the thread's member list failing to load, e.g. leaving for an error page.
pub trait MembersErrorHandler: Send + Sync {
    fn on_members_error(&self);
}
