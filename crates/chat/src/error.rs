use huddle_sync::SyncError;
use snafu::Snafu;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChatError {
    #[snafu(display("Topic cannot be over {max} characters (got {length})"))]
    TopicTooLong {
        stage: &'static str,
        length: usize,
        max: usize,
    },
    #[snafu(display("a topic save is already in flight on `{stage}`"))]
    TopicSaveInFlight { stage: &'static str },
    #[snafu(display("chat SDK rejected `{action}` on `{stage}`: {details}"))]
    ThreadAction {
        stage: &'static str,
        action: &'static str,
        details: String,
    },
    #[snafu(display("removal of participant '{identity}' was denied on `{stage}`"))]
    ParticipantRemovalDenied {
        stage: &'static str,
        identity: String,
    },
    #[snafu(display("chat screen lifecycle failed on `{stage}`: {source}"))]
    Lifecycle {
        stage: &'static str,
        source: SyncError,
    },
    #[snafu(display("settings error on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
}

pub type ChatResult<T> = Result<T, ChatError>;
