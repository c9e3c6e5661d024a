//! Demo that pushes a scripted join/leave sequence through the relay
//! (in-memory transport, simulated clock; nothing leaves the process).

use std::sync::Arc;

use chrono::Utc;
use lounge_relay::{
    LoungeRelay, ManualClock, Outcome, RecordingTransport, RelaySettings, RosterEntry,
    VoiceChannelRef, VoiceStateTransition,
};

fn lounge_join(roster: &[(u64, &str)]) -> VoiceStateTransition {
    VoiceStateTransition {
        member: lounge_relay::MemberId(1),
        display_name: "Ada".into(),
        before: None,
        after: Some(VoiceChannelRef::new(10, "Lounge")),
        after_members: roster
            .iter()
            .map(|(id, name)| RosterEntry::new(*id, *name))
            .collect(),
        activity: "Playing Factorio".into(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let transport = Arc::new(RecordingTransport::new(99));
    let relay = LoungeRelay::new(
        RelaySettings::new("Lounge", 99, 7_200),
        Arc::clone(&transport),
        Arc::clone(&clock),
    );

    // (seconds since previous step, resume first?, roster)
    let script: [(i64, bool, &[(u64, &str)]); 5] = [
        (0, false, &[(1, "Ada"), (2, "Grace")]),
        (100, false, &[(1, "Ada")]),
        (7_200, false, &[(1, "Ada")]),
        (10, true, &[(1, "Ada")]),
        (5, false, &[(2, "Grace")]),
    ];

    for (step, (advance, resume, roster)) in script.into_iter().enumerate() {
        clock.advance_secs(advance);
        if resume {
            relay.on_resumed();
        }
        let outcome = relay.handle_transition(&lounge_join(roster));
        println!("step {step}: {outcome:?}");
        if let Outcome::Notified(task) = outcome {
            let _ = task.await;
        }
    }

    for text in transport.sent_texts() {
        println!("---\n{text}");
    }
    println!("relay-demo done");
}
