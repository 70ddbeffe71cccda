use huddle_sync::{DecorationSnapshot, Identity, RosterSnapshot};

/// One row of the people pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub identity: Identity,
    pub display_name: String,
    /// Decoration marker, empty until the reconciler has resolved one.
    pub avatar: String,
    pub is_you: bool,
}

pub fn member_entries(
    roster: &RosterSnapshot,
    decorations: &DecorationSnapshot,
    local: Option<&Identity>,
) -> Vec<MemberEntry> {
    roster
        .participants
        .iter()
        .map(|participant| MemberEntry {
            identity: participant.id.clone(),
            display_name: participant.display_name.clone(),
            avatar: decorations
                .get(&participant.id)
                .map(|record| record.marker.clone())
                .unwrap_or_default(),
            is_you: local.is_some_and(|local| local == &participant.id),
        })
        .collect()
}
