use super::NotificationTransport;
use anyhow::{anyhow, Context as _, Result};
use once_cell::sync::OnceCell;
use serenity::all::ChannelId;
use serenity::cache::Cache;
use serenity::http::Http;
use std::sync::Arc;

/// Posts notifications through the gateway client's cache + HTTP handle.
///
/// The handles only exist once the client is running, so the transport is
/// created unbound and attached from the `ready` event.
#[derive(Clone, Default)]
pub struct SerenityTransport {
    handles: Arc<OnceCell<(Arc<Cache>, Arc<Http>)>>,
}

impl SerenityTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the client's handles. Later calls (re-ready) are no-ops.
    pub fn bind(&self, cache: Arc<Cache>, http: Arc<Http>) {
        let _ = self.handles.set((cache, http));
    }

    pub fn is_bound(&self) -> bool {
        self.handles.get().is_some()
    }
}

#[async_trait::async_trait]
impl NotificationTransport for SerenityTransport {
    type Channel = ChannelId;

    async fn resolve_text_channel(&self, channel_id: u64) -> Option<ChannelId> {
        if channel_id == 0 {
            return None;
        }
        let (cache, _) = self.handles.get()?;
        let id = ChannelId::new(channel_id);
        // cache refs are not Send; drop before returning
        let known = cache.channel(id).is_some();
        known.then_some(id)
    }

    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        let (_, http) = self
            .handles
            .get()
            .ok_or_else(|| anyhow!("Discord client not ready yet"))?;
        channel
            .say(http.as_ref(), text)
            .await
            .with_context(|| format!("posting to channel {channel}"))?;
        Ok(())
    }
}
