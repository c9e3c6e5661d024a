//! # Voice Transitions
//! Platform-neutral model of a voice-state change plus the pure classifier
//! that decides whether it is a join to the lounge, a leave, or noise.
//!
//! Channels are compared by identity only. Display names are used solely to
//! recognize the configured target; two channels may share a name.

use std::fmt;

/// Stable platform user identifier. Only ever used as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable platform channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

/// A voice channel as seen at event time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChannelRef {
    pub id: ChannelId,
    pub name: String,
}

impl VoiceChannelRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: ChannelId(id),
            name: name.into(),
        }
    }

    /// Same channel iff identities match.
    pub fn same_channel(&self, other: &VoiceChannelRef) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub member: MemberId,
    pub display_name: String,
}

impl RosterEntry {
    pub fn new(member: u64, display_name: impl Into<String>) -> Self {
        Self {
            member: MemberId(member),
            display_name: display_name.into(),
        }
    }
}

/// One observed voice-state change for a single member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStateTransition {
    pub member: MemberId,
    pub display_name: String,
    pub before: Option<VoiceChannelRef>,
    pub after: Option<VoiceChannelRef>,
    /// Live roster of `after` when the event was delivered (empty if `after` is none).
    pub after_members: Vec<RosterEntry>,
    /// Pre-resolved status line, see [`crate::activity::summarize`].
    pub activity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    JoinTarget,
    LeaveTarget,
    Ignore,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JoinTarget => "join",
            EventKind::LeaveTarget => "leave",
            EventKind::Ignore => "ignore",
        }
    }
}

/// Classify a transition against the target channel name.
///
/// Leave is checked first, so moving from the lounge straight into another
/// channel called the same name is a leave.
pub fn classify(t: &VoiceStateTransition, target_name: &str) -> EventKind {
    if let Some(before) = &t.before {
        let moved_away = match &t.after {
            None => true,
            Some(after) => !after.same_channel(before),
        };
        if before.name == target_name && moved_away {
            return EventKind::LeaveTarget;
        }
    }

    if let Some(after) = &t.after {
        let arrived = match &t.before {
            None => true,
            Some(before) => !before.same_channel(after),
        };
        if after.name == target_name && arrived {
            return EventKind::JoinTarget;
        }
    }

    EventKind::Ignore
}

/// A join is stale when the member is missing from the live roster,
/// which is what a replayed event looks like after a reconnect.
pub fn is_stale(t: &VoiceStateTransition) -> bool {
    !t.after_members.iter().any(|m| m.member == t.member)
}

/// Roster display names joined with `", "`.
pub fn roster_names(t: &VoiceStateTransition) -> String {
    t.after_members
        .iter()
        .map(|m| m.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
