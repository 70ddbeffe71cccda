use std::fmt;

/// Opaque participant key, unique within one thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Decorative annotation shown next to a participant, e.g. an emoji avatar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnrichmentRecord {
    pub marker: String,
}

impl EnrichmentRecord {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

/// One roster row as reported by the chat SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub id: Identity,
    pub display_name: String,
}

impl ParticipantRecord {
    pub fn new(id: impl Into<Identity>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Counter identifying one published value of a store field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Revision(pub u64);

impl Revision {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "r{}", self.0)
    }
}

/// Identifier of one reconciliation pass.
///
/// Strictly increasing per reconciler, so a commit can tell whether a newer pass started
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub u64);

impl PassId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Roster as of one refresh; replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RosterSnapshot {
    pub revision: Revision,
    pub participants: Vec<ParticipantRecord>,
}

impl RosterSnapshot {
    /// Identities in roster order with duplicates collapsed.
    pub fn identities(&self) -> Vec<Identity> {
        let mut seen = std::collections::HashSet::new();
        self.participants
            .iter()
            .filter(|participant| seen.insert(&participant.id))
            .map(|participant| participant.id.clone())
            .collect()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.participants
            .iter()
            .any(|participant| &participant.id == identity)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// Thread properties mirrored from the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreadSnapshot {
    pub revision: Revision,
    pub topic: Option<String>,
}

impl ThreadSnapshot {
    /// A blank topic counts as no topic.
    pub fn existing_topic(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
    }
}
