//! Side panel model: pane selection, the people list and thread settings.

pub mod members;
pub mod topic;

use std::sync::Arc;

use huddle_sync::{ChatStore, Identity};

use crate::actions::{FocusSink, ThreadActions};
use crate::error::{ChatError, ChatResult};

pub use members::{MemberEntry, member_entries};
pub use topic::TopicEditor;

pub const REMOVAL_DENIED_NOTICE: &str =
    "You can't remove participant at this time. Please wait at least 60 seconds to try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidePane {
    #[default]
    None,
    People,
    Settings,
}

impl SidePane {
    /// The people pane opens by default only on viewports wider than `min_width`.
    pub fn for_viewport(width: u32, min_width: u32) -> Self {
        if width > min_width {
            Self::People
        } else {
            Self::None
        }
    }

    /// Selecting the pane that is already open closes it.
    pub fn toggled(self, selected: SidePane) -> Self {
        if self == selected {
            Self::None
        } else {
            selected
        }
    }
}

pub struct SidePanel {
    store: Arc<ChatStore>,
    actions: Arc<dyn ThreadActions>,
    focus: Arc<dyn FocusSink>,
    local: Identity,
    pane: SidePane,
    editor: TopicEditor,
}

impl SidePanel {
    pub fn new(
        store: Arc<ChatStore>,
        actions: Arc<dyn ThreadActions>,
        focus: Arc<dyn FocusSink>,
        local: Identity,
        max_topic_length: usize,
    ) -> Self {
        Self {
            store,
            actions,
            focus,
            local,
            pane: SidePane::None,
            editor: TopicEditor::new(max_topic_length),
        }
    }

    pub fn pane(&self) -> SidePane {
        self.pane
    }

    pub fn set_pane(&mut self, pane: SidePane) {
        self.pane = pane;
    }

    pub fn toggle(&mut self, pane: SidePane) {
        self.pane = self.pane.toggled(pane);
    }

    pub fn members(&self) -> Vec<MemberEntry> {
        member_entries(
            &self.store.roster(),
            &self.store.decorations(),
            Some(&self.local),
        )
    }

    pub fn editor(&self) -> &TopicEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut TopicEditor {
        &mut self.editor
    }

    /// Current text of the topic field.
    pub fn topic_text(&self) -> String {
        self.editor.display_value(&self.store.thread()).to_string()
    }

    pub async fn submit_topic(&mut self) -> ChatResult<()> {
        self.editor
            .submit(self.actions.as_ref(), self.focus.as_ref())
            .await
    }

    /// A denied removal raises the store flag read by [`Self::take_removal_notice`].
    pub async fn remove_participant(&self, identity: &Identity) -> ChatResult<()> {
        let result = self.actions.remove_participant(identity).await;
        match &result {
            Err(ChatError::ParticipantRemovalDenied { .. }) => {
                tracing::info!(identity = %identity, "participant removal denied");
                self.store.flag_removal_denied();
            }
            Err(error) => {
                tracing::warn!(identity = %identity, error = %error, "participant removal failed");
            }
            Ok(()) => tracing::debug!(identity = %identity, "participant removed"),
        }
        result
    }

    /// Yields the denial notice once per denial.
    pub fn take_removal_notice(&self) -> Option<&'static str> {
        self.store
            .take_removal_denied()
            .then_some(REMOVAL_DENIED_NOTICE)
    }
}
