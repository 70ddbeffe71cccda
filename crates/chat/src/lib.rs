#![deny(unsafe_code)]

pub mod actions;
pub mod error;
pub mod panel;
pub mod screen;
pub mod settings;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use actions::{FocusSink, MembersErrorHandler, ThreadActions, TracingFocus};
pub use error::{ChatError, ChatResult};
pub use panel::{MemberEntry, SidePane, SidePanel, TopicEditor};
pub use screen::{ChatScreen, MountState, ScreenServices};
pub use settings::{ChatSettings, SettingsError, SettingsStore};
pub use typing::{TypingTracker, typing_indicator_list, typing_indicator_verb};
