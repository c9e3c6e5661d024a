// src/activity.rs
//! Activity summary shown next to a join ("🎮 Status: ...").

pub const NO_ACTIVITY: &str = "No activity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
}

/// One concurrent activity as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Playing { name: String },
    Streaming { game: Option<String> },
    /// `track` is only present for rich music presences (e.g. Spotify).
    Listening {
        name: Option<String>,
        track: Option<Track>,
    },
    Other { name: Option<String> },
}

impl Activity {
    /// Render this activity, or `None` if it carries nothing displayable.
    pub fn render(&self) -> Option<String> {
        match self {
            Activity::Playing { name } => Some(name.clone()).filter(|n| !n.is_empty()),
            Activity::Streaming { game: Some(game) } => Some(format!("Streaming {game}")),
            Activity::Streaming { game: None } => Some("Streaming".to_string()),
            Activity::Listening {
                track: Some(track), ..
            } => Some(format!(
                "Listening to {} by {}",
                track.title, track.artist
            )),
            Activity::Listening { name, track: None } | Activity::Other { name } => {
                name.as_deref().filter(|n| !n.is_empty()).map(str::to_string)
            }
        }
    }
}

/// First displayable activity in list order, else [`NO_ACTIVITY`].
pub fn summarize(activities: &[Activity]) -> String {
    activities
        .iter()
        .find_map(Activity::render)
        .unwrap_or_else(|| NO_ACTIVITY.to_string())
}
