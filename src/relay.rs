//! # Lounge Relay
//! Per-event pipeline: classify → staleness check → cooldown → notify.
//!
//! Everything up to the cooldown decision runs synchronously under the
//! tracker lock, so two transitions can never interleave between lookup and
//! update. Delivery is spawned onto the runtime and never blocks the next
//! event. No outcome of a single event is an error for the caller.

use std::sync::{Arc, Mutex, MutexGuard};

use ::metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RelaySettings;
use crate::metrics::{
    ensure_metrics_described, EVENTS_TOTAL, JOINS_STALE_TOTAL, JOINS_SUPPRESSED_TOTAL,
    NOTIFICATIONS_FAILED_TOTAL, NOTIFICATIONS_SENT_TOTAL, RESUMES_TOTAL,
};
use crate::notify::{JoinNotice, NotificationTransport};
use crate::suppression::{Clock, JoinVerdict, SuppressionTracker, SystemClock};
use crate::voice::{classify, is_stale, roster_names, EventKind, VoiceStateTransition};

/// What the relay did with one transition.
#[derive(Debug)]
pub enum Outcome {
    Ignored,
    Left,
    Stale,
    Suppressed { elapsed_secs: i64 },
    /// Accepted; delivery runs on the returned task.
    Notified(JoinHandle<()>),
}

impl Outcome {
    pub fn is_notified(&self) -> bool {
        matches!(self, Outcome::Notified(_))
    }
}

pub struct LoungeRelay<T, C = SystemClock> {
    settings: RelaySettings,
    tracker: Mutex<SuppressionTracker>,
    transport: Arc<T>,
    clock: C,
}

impl<T: NotificationTransport, C: Clock> LoungeRelay<T, C> {
    pub fn new(settings: RelaySettings, transport: Arc<T>, clock: C) -> Self {
        ensure_metrics_described();
        let tracker = SuppressionTracker::new(settings.time_threshold_secs);
        Self {
            settings,
            tracker: Mutex::new(tracker),
            transport,
            clock,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Number of members currently inside (or past) a cooldown window.
    pub fn tracked_members(&self) -> usize {
        self.lock_tracker().len()
    }

    fn lock_tracker(&self) -> MutexGuard<'_, SuppressionTracker> {
        // a panic mid-update cannot leave the map half-written; keep going
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Process one voice-state transition. Must be called inside a tokio runtime.
    pub fn handle_transition(&self, t: &VoiceStateTransition) -> Outcome {
        let target = self.settings.voice_channel_name.as_str();
        let kind = classify(t, target);
        counter!(EVENTS_TOTAL, "kind" => kind.as_str()).increment(1);

        match kind {
            EventKind::LeaveTarget => {
                let dest = t
                    .after
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("disconnected");
                info!(member = %t.member, "LEAVE: {} left '{}' → {}", t.display_name, target, dest);
                return Outcome::Left;
            }
            EventKind::Ignore => {
                debug!(
                    member = %t.member,
                    "IGNORE: {} voice state change (not a '{}' join)",
                    t.display_name, target
                );
                return Outcome::Ignored;
            }
            EventKind::JoinTarget => {}
        }

        debug!(member = %t.member, "JOIN EVENT: {} → '{}'", t.display_name, target);

        if is_stale(t) {
            counter!(JOINS_STALE_TOTAL).increment(1);
            warn!(
                member = %t.member,
                "STALE EVENT: {} triggered join for '{}' but is not in the channel member list. Suppressing notification.",
                t.display_name, target
            );
            return Outcome::Stale;
        }

        let verdict = {
            let mut tracker = self.lock_tracker();
            // sampled under the lock so verdicts follow lock order
            let now = self.clock.now();
            tracker.evaluate_join(t.member, now)
        };

        if let JoinVerdict::Suppress { elapsed_secs } = verdict {
            counter!(JOINS_SUPPRESSED_TOTAL).increment(1);
            info!(
                member = %t.member,
                elapsed_secs,
                threshold_secs = self.settings.time_threshold_secs,
                "SUPPRESSED: {} rejoined '{}' after {}s (threshold: {}s). Activity: {}",
                t.display_name,
                target,
                elapsed_secs,
                self.settings.time_threshold_secs,
                t.activity
            );
            return Outcome::Suppressed { elapsed_secs };
        }

        let notice = JoinNotice {
            display_name: t.display_name.clone(),
            channel_name: t
                .after
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| target.to_string()),
            roster: roster_names(t),
            activity: t.activity.clone(),
        };
        info!(
            member = %t.member,
            "JOIN: {} → '{}' | Members: {} | Activity: {}",
            notice.display_name, target, notice.roster, notice.activity
        );

        Outcome::Notified(self.dispatch_notification(notice))
    }

    /// Fire-and-forget delivery. Failures are logged; the accepted join stays recorded.
    pub fn dispatch_notification(&self, notice: JoinNotice) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let channel_id = self.settings.text_channel_id;

        tokio::spawn(async move {
            let Some(channel) = transport.resolve_text_channel(channel_id).await else {
                counter!(NOTIFICATIONS_FAILED_TOTAL, "reason" => "channel_not_found").increment(1);
                warn!(
                    channel_id,
                    "Text channel {} not found. Is the bot in the right server?", channel_id
                );
                return;
            };

            match transport.send(&channel, &notice.render()).await {
                Ok(()) => {
                    counter!(NOTIFICATIONS_SENT_TOTAL).increment(1);
                    info!(channel_id, "NOTIFY: Sent join notification for {}", notice.display_name);
                }
                Err(e) => {
                    counter!(NOTIFICATIONS_FAILED_TOTAL, "reason" => "send").increment(1);
                    error!(channel_id, "NOTIFY FAILED: Could not send message: {e:#}");
                }
            }
        })
    }

    /// Gateway session resumed: buffered events may replay, drop all cooldowns.
    pub fn on_resumed(&self) {
        counter!(RESUMES_TOTAL).increment(1);
        let mut tracker = self.lock_tracker();
        let dropped = tracker.len();
        tracker.clear();
        warn!(
            dropped,
            "Gateway session resumed. Clearing stale join time cache."
        );
    }

    pub fn on_disconnected(&self) {
        warn!("Bot disconnected from Discord gateway.");
    }

    pub fn on_ready(&self, bot_name: &str, bot_id: u64) {
        info!("Logged in as {} (ID: {})", bot_name, bot_id);
        info!("Monitoring voice channel: '{}'", self.settings.voice_channel_name);
        info!("Notifications channel ID: {}", self.settings.text_channel_id);
        info!("Spam threshold: {}s", self.settings.time_threshold_secs);
        info!("Bot is ready and listening for voice state updates.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingTransport;
    use crate::suppression::ManualClock;
    use crate::voice::{MemberId, RosterEntry, VoiceChannelRef};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Weak;

    fn relay(secs: i64) -> (LoungeRelay<RecordingTransport, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap(),
        ));
        let relay = LoungeRelay::new(
            RelaySettings::new("Lounge", 99, secs),
            Arc::new(RecordingTransport::new(99)),
            Arc::clone(&clock),
        );
        (relay, clock)
    }

    fn join(member: u64, roster: &[(u64, &str)]) -> VoiceStateTransition {
        VoiceStateTransition {
            member: MemberId(member),
            display_name: format!("user{member}"),
            before: None,
            after: Some(VoiceChannelRef::new(10, "Lounge")),
            after_members: roster
                .iter()
                .map(|(id, name)| RosterEntry::new(*id, *name))
                .collect(),
            activity: "No activity".into(),
        }
    }

    #[tokio::test]
    async fn stale_join_leaves_tracker_untouched() {
        let (relay, _) = relay(60);
        let out = relay.handle_transition(&join(1, &[(2, "other")]));
        assert!(matches!(out, Outcome::Stale));
        assert_eq!(relay.tracked_members(), 0);
        assert!(relay.transport().sent_texts().is_empty());
    }

    #[tokio::test]
    async fn leave_and_ignore_touch_nothing() {
        let (relay, _) = relay(60);
        let mut leave = join(1, &[]);
        leave.before = leave.after.take();
        assert!(matches!(relay.handle_transition(&leave), Outcome::Left));

        let mut other = join(1, &[(1, "user1")]);
        other.after = Some(VoiceChannelRef::new(20, "Games"));
        assert!(matches!(relay.handle_transition(&other), Outcome::Ignored));
        assert_eq!(relay.tracked_members(), 0);
    }

    #[tokio::test]
    async fn accepted_join_records_and_sends() {
        let (relay, clock) = relay(60);
        let Outcome::Notified(task) = relay.handle_transition(&join(1, &[(1, "user1")])) else {
            panic!("expected notification");
        };
        task.await.unwrap();
        assert_eq!(relay.tracked_members(), 1);
        assert_eq!(relay.transport().sent_texts().len(), 1);

        clock.advance_secs(30);
        let out = relay.handle_transition(&join(1, &[(1, "user1")]));
        assert!(matches!(out, Outcome::Suppressed { elapsed_secs: 30 }));
    }

    /// Reports whether the relay's tracker lock is held when time is read.
    struct LockCheckClock {
        relay: once_cell::sync::OnceCell<Weak<LoungeRelay<RecordingTransport, Arc<LockCheckClock>>>>,
        read_under_lock: AtomicBool,
    }

    impl Clock for LockCheckClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            if let Some(relay) = self.relay.get().and_then(Weak::upgrade) {
                let held = relay.tracker.try_lock().is_err();
                self.read_under_lock.store(held, Ordering::SeqCst);
            }
            Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
        }
    }

    #[tokio::test]
    async fn clock_is_read_while_tracker_is_locked() {
        let clock = Arc::new(LockCheckClock {
            relay: once_cell::sync::OnceCell::new(),
            read_under_lock: AtomicBool::new(false),
        });
        let relay = Arc::new(LoungeRelay::new(
            RelaySettings::new("Lounge", 99, 60),
            Arc::new(RecordingTransport::new(99)),
            Arc::clone(&clock),
        ));
        let _ = clock.relay.set(Arc::downgrade(&relay));

        let out = relay.handle_transition(&join(1, &[(1, "user1")]));
        assert!(out.is_notified());
        assert!(clock.read_under_lock.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn resume_clears_tracker() {
        let (relay, _) = relay(60);
        relay.handle_transition(&join(1, &[(1, "user1")]));
        relay.on_resumed();
        assert_eq!(relay.tracked_members(), 0);
    }
}
