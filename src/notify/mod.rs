pub mod discord;

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Outbound side of the relay: find the text channel, post into it.
#[async_trait::async_trait]
pub trait NotificationTransport: Send + Sync + 'static {
    type Channel: Send + Sync;

    /// `None` when the channel is unknown to the client.
    async fn resolve_text_channel(&self, channel_id: u64) -> Option<Self::Channel>;

    async fn send(&self, channel: &Self::Channel, text: &str) -> Result<()>;
}

/// Content of one "member joined" announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinNotice {
    pub display_name: String,
    pub channel_name: String,
    pub roster: String, // ", "-joined display names
    pub activity: String,
}

impl JoinNotice {
    pub fn render(&self) -> String {
        format!(
            "@here\n🔊 **{}** has joined **{}**.\n👥 Current members in the channel: {}\n🎮 Status: {}",
            self.display_name, self.channel_name, self.roster, self.activity
        )
    }
}

// --- Test/demo helper ---
/// In-memory transport that records every send.
pub struct RecordingTransport {
    channel_id: Option<u64>,
    fail_sends: AtomicBool,
    pub sent: Mutex<Vec<(u64, String)>>,
}

impl RecordingTransport {
    /// Knows exactly one text channel.
    pub fn new(channel_id: u64) -> Self {
        Self {
            channel_id: Some(channel_id),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(vec![]),
        }
    }

    /// Knows no channels at all; every lookup misses.
    pub fn without_channel() -> Self {
        Self {
            channel_id: None,
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(vec![]),
        }
    }

    /// Every send after this returns an error.
    pub fn failing(self) -> Self {
        self.fail_sends.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationTransport for RecordingTransport {
    type Channel = u64;

    async fn resolve_text_channel(&self, channel_id: u64) -> Option<u64> {
        self.channel_id.filter(|id| *id == channel_id)
    }

    async fn send(&self, channel: &u64, text: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(anyhow!("recording transport: send to {channel} rejected"));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((*channel, text.to_string()));
        Ok(())
    }
}
