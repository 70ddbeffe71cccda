use std::time::Duration;

use huddle_sync::ThreadSnapshot;

use crate::actions::{FOCUS_BUTTON_CONTROL, FocusSink, ThreadActions};
use crate::error::{ChatResult, TopicSaveInFlightSnafu, TopicTooLongSnafu};
use crate::settings::state::DEFAULT_MAX_TOPIC_LENGTH;

pub const TOPIC_PLACEHOLDER: &str = "Type a group name";
pub const SAVE_LABEL: &str = "Save";
pub const SAVING_LABEL: &str = "Saving...";

/// Delay before focus returns to the topic button after a submit.
pub const FOCUS_RESTORE_DELAY: Duration = Duration::from_millis(100);

/// Edit state of the thread topic field in the settings pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEditor {
    max_length: usize,
    draft: String,
    editing: bool,
    saving: bool,
}

impl Default for TopicEditor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOPIC_LENGTH)
    }
}

impl TopicEditor {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            draft: String::new(),
            editing: false,
            saving: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn on_text_change(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.editing = true;
    }

    pub fn cancel(&mut self) {
        self.draft.clear();
        self.editing = false;
    }

    pub fn is_overflowing(&self) -> bool {
        self.draft.chars().count() > self.max_length
    }

    pub fn overflow_warning(&self) -> Option<String> {
        self.is_overflowing()
            .then(|| format!("Topic cannot be over {} characters", self.max_length))
    }

    pub fn display_value<'a>(&'a self, thread: &'a ThreadSnapshot) -> &'a str {
        if self.editing {
            &self.draft
        } else {
            thread.existing_topic().unwrap_or_default()
        }
    }

    pub fn placeholder(&self, thread: &ThreadSnapshot) -> Option<&'static str> {
        thread.existing_topic().is_none().then_some(TOPIC_PLACEHOLDER)
    }

    pub fn button_text(&self) -> &'static str {
        if self.saving {
            SAVING_LABEL
        } else {
            SAVE_LABEL
        }
    }

    /// Validates the draft, marks the editor saving and leaves edit mode.
    ///
    /// Returns the topic to hand to the SDK. The draft is kept, so saving again without
    /// retyping resends the same topic.
    pub fn begin_submit(&mut self) -> ChatResult<String> {
        if self.saving {
            return TopicSaveInFlightSnafu {
                stage: "topic-begin-submit",
            }
            .fail();
        }
        if self.is_overflowing() {
            return TopicTooLongSnafu {
                stage: "topic-begin-submit",
                length: self.draft.chars().count(),
                max: self.max_length,
            }
            .fail();
        }

        self.saving = true;
        self.editing = false;
        Ok(self.draft.clone())
    }

    pub fn finish_submit(&mut self) {
        self.saving = false;
    }

    /// Saves the draft as the thread topic.
    ///
    /// Focus moves to the topic button [`FOCUS_RESTORE_DELAY`] after the request is sent,
    /// whether or not the SDK has answered by then.
    pub async fn submit(
        &mut self,
        actions: &dyn ThreadActions,
        focus: &dyn FocusSink,
    ) -> ChatResult<()> {
        let topic = self.begin_submit()?;
        tracing::debug!(topic = %topic, "saving thread topic");

        let (result, ()) = tokio::join!(actions.update_thread_topic(&topic), async {
            tokio::time::sleep(FOCUS_RESTORE_DELAY).await;
            focus.focus(FOCUS_BUTTON_CONTROL);
        });

        self.finish_submit();
        if let Err(error) = &result {
            tracing::warn!(error = %error, "thread topic update failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::test_support::{RecordingActions, RecordingFocus};

    fn thread(topic: Option<&str>) -> ThreadSnapshot {
        ThreadSnapshot {
            topic: topic.map(str::to_string),
            ..ThreadSnapshot::default()
        }
    }

    #[test]
    fn overflow_sets_warning_and_blocks_submission() {
        let mut editor = TopicEditor::new(30);
        editor.on_text_change("a".repeat(31));

        assert_eq!(
            editor.overflow_warning().as_deref(),
            Some("Topic cannot be over 30 characters")
        );
        let error = editor.begin_submit().expect_err("overflowing draft");
        assert!(matches!(
            error,
            ChatError::TopicTooLong {
                length: 31,
                max: 30,
                ..
            }
        ));
        assert!(!editor.is_saving());
        assert!(editor.is_editing());
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        let mut editor = TopicEditor::new(3);
        editor.on_text_change("🙂🙂🙂");

        assert!(!editor.is_overflowing());
        assert!(editor.overflow_warning().is_none());
    }

    #[test]
    fn display_value_prefers_draft_while_editing() {
        let mut editor = TopicEditor::default();
        let named = thread(Some("Standup"));

        assert_eq!(editor.display_value(&named), "Standup");
        assert_eq!(editor.placeholder(&named), None);

        editor.on_text_change("Retro");
        assert_eq!(editor.display_value(&named), "Retro");

        let unnamed = thread(Some("   "));
        editor.cancel();
        assert_eq!(editor.display_value(&unnamed), "");
        assert_eq!(editor.placeholder(&unnamed), Some(TOPIC_PLACEHOLDER));
    }

    #[test]
    fn submitting_while_saving_is_rejected() {
        let mut editor = TopicEditor::default();
        editor.on_text_change("Standup");
        editor.begin_submit().expect("first submit");
        assert_eq!(editor.button_text(), SAVING_LABEL);

        editor.on_text_change("Retro");
        let error = editor.begin_submit().expect_err("save in flight");
        assert!(matches!(error, ChatError::TopicSaveInFlight { .. }));

        editor.finish_submit();
        assert_eq!(editor.button_text(), SAVE_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_saves_topic_and_restores_focus() {
        let actions = RecordingActions::new().with_topic_latency(Duration::from_millis(500));
        let focus = RecordingFocus::default();
        let mut editor = TopicEditor::default();
        editor.on_text_change("Standup");

        let started = tokio::time::Instant::now();
        editor
            .submit(&actions, &focus)
            .await
            .expect("topic saved");

        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(actions.topics(), vec!["Standup".to_string()]);
        assert_eq!(focus.requests(), vec![FOCUS_BUTTON_CONTROL.to_string()]);
        assert!(!editor.is_saving());
        assert!(!editor.is_editing());
    }

    #[tokio::test(start_paused = true)]
    async fn saving_twice_resends_the_last_typed_topic() {
        let actions = RecordingActions::new();
        let focus = RecordingFocus::default();
        let mut editor = TopicEditor::default();
        editor.on_text_change("Standup");

        editor.submit(&actions, &focus).await.expect("first save");
        editor.submit(&actions, &focus).await.expect("second save");

        assert_eq!(
            actions.topics(),
            vec!["Standup".to_string(), "Standup".to_string()]
        );
        assert_eq!(editor.draft(), "Standup");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_clears_the_saving_flag() {
        let actions = RecordingActions::new().failing_topic_updates();
        let focus = RecordingFocus::default();
        let mut editor = TopicEditor::default();
        editor.on_text_change("Standup");

        let error = editor
            .submit(&actions, &focus)
            .await
            .expect_err("sdk rejects");

        assert!(matches!(
            error,
            ChatError::ThreadAction {
                action: "update_thread_topic",
                ..
            }
        ));
        assert!(!editor.is_saving());
    }
}
