// tests/relay_scenarios.rs
//
// End-to-end walk through the relay with a simulated clock and an
// in-memory transport: joins, rejoins inside/outside the cooldown, resumes.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use lounge_relay::{
    LoungeRelay, ManualClock, MemberId, Outcome, RecordingTransport, RelaySettings, RosterEntry,
    VoiceChannelRef, VoiceStateTransition,
};

const TEXT_CHANNEL: u64 = 555;
const LOUNGE_ID: u64 = 10;

type TestRelay = LoungeRelay<RecordingTransport, Arc<ManualClock>>;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 30, 0, 30, 0).unwrap()
}

fn setup(threshold: i64) -> (TestRelay, Arc<ManualClock>, Arc<RecordingTransport>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let transport = Arc::new(RecordingTransport::new(TEXT_CHANNEL));
    let relay = LoungeRelay::new(
        RelaySettings::new("Lounge", TEXT_CHANNEL, threshold),
        Arc::clone(&transport),
        Arc::clone(&clock),
    );
    (relay, clock, transport)
}

fn join_lounge(member: u64, name: &str, roster: &[(u64, &str)]) -> VoiceStateTransition {
    VoiceStateTransition {
        member: MemberId(member),
        display_name: name.into(),
        before: None,
        after: Some(VoiceChannelRef::new(LOUNGE_ID, "Lounge")),
        after_members: roster
            .iter()
            .map(|(id, n)| RosterEntry::new(*id, *n))
            .collect(),
        activity: "No activity".into(),
    }
}

fn leave_lounge(member: u64, name: &str) -> VoiceStateTransition {
    VoiceStateTransition {
        member: MemberId(member),
        display_name: name.into(),
        before: Some(VoiceChannelRef::new(LOUNGE_ID, "Lounge")),
        after: None,
        after_members: vec![],
        activity: "No activity".into(),
    }
}

async fn expect_notified(out: Outcome) {
    match out {
        Outcome::Notified(task) => task.await.expect("delivery task panicked"),
        other => panic!("expected notification, got {other:?}"),
    }
}

#[tokio::test]
async fn join_rejoin_and_cooldown_expiry() {
    let (relay, clock, transport) = setup(7_200);
    let m = join_lounge(1, "Mia", &[(1, "Mia")]);

    expect_notified(relay.handle_transition(&m)).await;
    assert_eq!(transport.sent_texts().len(), 1);

    clock.advance_secs(50);
    assert!(matches!(relay.handle_transition(&leave_lounge(1, "Mia")), Outcome::Left));

    clock.advance_secs(50);
    let out = relay.handle_transition(&m);
    assert!(matches!(out, Outcome::Suppressed { elapsed_secs: 100 }));
    assert_eq!(transport.sent_texts().len(), 1);

    clock.set(t0() + chrono::Duration::seconds(7_300));
    expect_notified(relay.handle_transition(&m)).await;
    assert_eq!(transport.sent_texts().len(), 2);
}

#[tokio::test]
async fn resume_resets_cooldown() {
    let (relay, clock, transport) = setup(7_200);
    let m = join_lounge(1, "Mia", &[(1, "Mia")]);

    expect_notified(relay.handle_transition(&m)).await;
    relay.on_resumed();

    clock.advance_secs(50);
    expect_notified(relay.handle_transition(&m)).await;
    assert_eq!(transport.sent_texts().len(), 2);
}

#[tokio::test]
async fn rapid_rejoins_stay_anchored_to_first_accept() {
    let (relay, clock, _transport) = setup(60);
    let m = join_lounge(1, "Mia", &[(1, "Mia")]);
    expect_notified(relay.handle_transition(&m)).await;

    for expected in 1..=3 {
        clock.advance_secs(1);
        match relay.handle_transition(&m) {
            Outcome::Suppressed { elapsed_secs } => assert_eq!(elapsed_secs, expected),
            other => panic!("expected suppression, got {other:?}"),
        }
    }

    // 57s later we're at t0+60: window measured from the first accept
    clock.advance_secs(57);
    assert!(relay.handle_transition(&m).is_notified());
}

#[tokio::test]
async fn threshold_boundary() {
    let (relay, clock, _transport) = setup(60);
    let m = join_lounge(1, "Mia", &[(1, "Mia")]);
    expect_notified(relay.handle_transition(&m)).await;

    clock.advance_secs(59);
    assert!(matches!(
        relay.handle_transition(&m),
        Outcome::Suppressed { elapsed_secs: 59 }
    ));

    clock.advance_secs(1);
    assert!(relay.handle_transition(&m).is_notified());
}

#[tokio::test]
async fn stale_replay_is_dropped_before_cooldown() {
    let (relay, _clock, transport) = setup(7_200);

    let replay = join_lounge(1, "Mia", &[(2, "Noah")]);
    assert!(matches!(relay.handle_transition(&replay), Outcome::Stale));
    assert_eq!(relay.tracked_members(), 0);

    // the stale event must not have armed the cooldown
    expect_notified(relay.handle_transition(&join_lounge(1, "Mia", &[(1, "Mia")]))).await;
    assert_eq!(transport.sent_texts().len(), 1);
}

#[tokio::test]
async fn notification_text_lists_roster_and_status() {
    let (relay, _clock, transport) = setup(7_200);
    let mut m = join_lounge(2, "Noah", &[(1, "Mia"), (2, "Noah")]);
    m.activity = "Listening to X by Y".into();

    expect_notified(relay.handle_transition(&m)).await;

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (channel, text) = &sent[0];
    assert_eq!(*channel, TEXT_CHANNEL);
    assert_eq!(
        text,
        "@here\n🔊 **Noah** has joined **Lounge**.\n👥 Current members in the channel: Mia, Noah\n🎮 Status: Listening to X by Y"
    );
}

#[tokio::test]
async fn unrelated_moves_are_ignored() {
    let (relay, _clock, transport) = setup(7_200);
    let t = VoiceStateTransition {
        member: MemberId(1),
        display_name: "Mia".into(),
        before: Some(VoiceChannelRef::new(20, "Games")),
        after: Some(VoiceChannelRef::new(30, "Music")),
        after_members: vec![RosterEntry::new(1, "Mia")],
        activity: "No activity".into(),
    };
    assert!(matches!(relay.handle_transition(&t), Outcome::Ignored));
    assert_eq!(relay.tracked_members(), 0);
    assert!(transport.sent_texts().is_empty());
}
