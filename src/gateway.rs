//! # Gateway
//! Serenity event handler that turns cached Discord state into
//! [`VoiceStateTransition`]s and feeds them to the relay.

use anyhow::{Context as _, Result};
use serenity::all as discord;
use serenity::all::{
    ActivityType, Cache, Client, ConnectionStage, Context, EventHandler, GatewayIntents, Ready,
    ResumedEvent, ShardStageUpdateEvent, VoiceState,
};
use serenity::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::activity::{summarize, Activity, Track};
use crate::config::RelayConfig;
use crate::notify::discord::SerenityTransport;
use crate::relay::LoungeRelay;
use crate::suppression::SystemClock;
use crate::voice::{MemberId, RosterEntry, VoiceChannelRef, VoiceStateTransition};

pub struct Handler {
    relay: LoungeRelay<SerenityTransport, SystemClock>,
}

impl Handler {
    pub fn new(relay: LoungeRelay<SerenityTransport, SystemClock>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.relay
            .transport()
            .bind(Arc::clone(&ctx.cache), Arc::clone(&ctx.http));
        self.relay.on_ready(&ready.user.name, ready.user.id.get());
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        self.relay.on_resumed();
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        if matches!(event.new, ConnectionStage::Disconnected) {
            self.relay.on_disconnected();
        } else {
            debug!(shard = ?event.shard_id, "shard stage {:?} → {:?}", event.old, event.new);
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        match build_transition(&ctx.cache, old.as_ref(), &new) {
            Some(transition) => {
                let _ = self.relay.handle_transition(&transition);
            }
            None => debug!(
                user = %new.user_id,
                "IGNORE: voice state update without cached guild context"
            ),
        }
    }
}

/// Snapshot everything the relay needs from the cache. Returns `None` for
/// DMs/group calls or when the guild is not cached.
///
/// `after_members` is sorted case-insensitively by display name, not by
/// join order: the cache keeps voice states in a hash map and records no
/// join time.
pub fn build_transition(
    cache: &Cache,
    old: Option<&VoiceState>,
    new: &VoiceState,
) -> Option<VoiceStateTransition> {
    let guild_id = new.guild_id?;
    let guild = cache.guild(guild_id)?;

    let channel_ref = |id: discord::ChannelId| {
        let name = guild
            .channels
            .get(&id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        VoiceChannelRef::new(id.get(), name)
    };
    let member_name = |user: discord::UserId| {
        guild
            .members
            .get(&user)
            .map(|m| m.display_name().to_string())
            .unwrap_or_else(|| user.to_string())
    };

    let before = old.and_then(|s| s.channel_id).map(channel_ref);
    let after = new.channel_id.map(channel_ref);

    // the cache is updated before dispatch, so this is the live roster
    let mut after_members: Vec<RosterEntry> = match new.channel_id {
        Some(cid) => guild
            .voice_states
            .values()
            .filter(|vs| vs.channel_id == Some(cid))
            .map(|vs| RosterEntry::new(vs.user_id.get(), member_name(vs.user_id)))
            .collect(),
        None => Vec::new(),
    };
    sort_roster(&mut after_members);

    let display_name = new
        .member
        .as_ref()
        .map(|m| m.display_name().to_string())
        .unwrap_or_else(|| member_name(new.user_id));

    let activities: Vec<Activity> = guild
        .presences
        .get(&new.user_id)
        .map(|p| p.activities.iter().map(convert_activity).collect())
        .unwrap_or_default();

    Some(VoiceStateTransition {
        member: MemberId(new.user_id.get()),
        display_name,
        before,
        after,
        after_members,
        activity: summarize(&activities),
    })
}

/// Alphabetical by display name, ignoring case.
pub fn sort_roster(roster: &mut [RosterEntry]) {
    roster.sort_by_key(|m| m.display_name.to_lowercase());
}

/// Map a Discord presence activity onto the closed [`Activity`] set.
pub fn convert_activity(a: &discord::Activity) -> Activity {
    let name = Some(a.name.clone()).filter(|n| !n.is_empty());
    match a.kind {
        ActivityType::Playing => match name {
            Some(name) => Activity::Playing { name },
            None => Activity::Other { name: None },
        },
        // Discord puts the streamed game title in `state`
        ActivityType::Streaming => Activity::Streaming {
            game: a.state.clone().filter(|g| !g.is_empty()),
        },
        // rich music presences: details = title, state = artist
        ActivityType::Listening => {
            let track = match (&a.details, &a.state) {
                (Some(title), Some(artist)) => Some(Track {
                    title: title.clone(),
                    artist: artist.clone(),
                }),
                _ => None,
            };
            Activity::Listening { name, track }
        }
        ActivityType::Custom => Activity::Other {
            name: a.state.clone().filter(|s| !s.is_empty()).or(name),
        },
        _ => Activity::Other { name },
    }
}

/// Connect to the gateway and process events until the client stops.
pub async fn run(config: RelayConfig) -> Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_PRESENCES;

    let transport = Arc::new(SerenityTransport::new());
    let relay = LoungeRelay::new(config.relay.clone(), transport, SystemClock);

    let mut client = Client::builder(&config.token, intents)
        .event_handler(Handler::new(relay))
        .await
        .context("building Discord client")?;

    info!("connecting to Discord gateway");
    client
        .start()
        .await
        .context("Discord gateway client stopped")?;
    Ok(())
}
