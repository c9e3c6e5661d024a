// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod activity;
pub mod config;
pub mod suppression;
pub mod voice;

// Outbound notifications + the per-event pipeline
pub mod notify;
pub mod relay;

// Discord wiring and ambient concerns
pub mod gateway;
pub mod logging;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::config::{RelayConfig, RelaySettings};
pub use crate::notify::{JoinNotice, NotificationTransport, RecordingTransport};
pub use crate::relay::{LoungeRelay, Outcome};
pub use crate::suppression::{Clock, JoinVerdict, ManualClock, SuppressionTracker, SystemClock};
pub use crate::voice::{EventKind, MemberId, RosterEntry, VoiceChannelRef, VoiceStateTransition};
