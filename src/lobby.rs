//! Social lobby: who is here, what they said, what they wear
//!
//! Transport-agnostic. Whatever carries presence and broadcast events feeds
//! them in; outbound broadcasts come back as serializable values. All time
//! is passed in as milliseconds so the roster stays testable.
//!
//! The game binary does not open a connection. It only reads the cosmetic
//! unlocks for the HUD; a host page or networking layer embeds `Lobby` and
//! pumps `on_sync`/`on_join`/`on_leave`/`on_broadcast` from its channel.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// How long a speech bubble stays up (ms)
pub const BUBBLE_DURATION_MS: u64 = 6000;
/// Fade-out window at the end of a bubble (ms)
pub const BUBBLE_FADE_MS: u64 = 1000;
/// Longest accepted chat line (chars)
pub const MAX_MESSAGE_LEN: usize = 120;

/// Quick reactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emote {
    Wave,
    Heart,
    Laugh,
    Zero,
}

impl Emote {
    pub fn glyph(&self) -> &'static str {
        match self {
            Emote::Wave => "👋",
            Emote::Heart => "❤",
            Emote::Laugh => "😂",
            Emote::Zero => "0",
        }
    }
}

/// Wearables, unlocked by cumulative play time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cosmetic {
    #[default]
    None,
    Bowtie,
    Hat,
    Crown,
}

impl Cosmetic {
    pub const ALL: [Cosmetic; 4] = [Cosmetic::None, Cosmetic::Bowtie, Cosmetic::Hat, Cosmetic::Crown];

    /// Play time required (ms)
    pub fn unlock_ms(&self) -> u64 {
        match self {
            Cosmetic::None => 0,
            Cosmetic::Bowtie => 5 * 60_000,
            Cosmetic::Hat => 15 * 60_000,
            Cosmetic::Crown => 60 * 60_000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cosmetic::None => "none",
            Cosmetic::Bowtie => "bowtie",
            Cosmetic::Hat => "hat",
            Cosmetic::Crown => "crown",
        }
    }

    pub fn is_unlocked(&self, time_played_ms: u64) -> bool {
        time_played_ms >= self.unlock_ms()
    }

    /// Everything wearable with this much play time
    pub fn unlocked(time_played_ms: u64) -> Vec<Cosmetic> {
        Self::ALL
            .into_iter()
            .filter(|c| c.is_unlocked(time_played_ms))
            .collect()
    }
}

/// What a peer publishes when tracking presence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub bob_offset: f32,
    #[serde(default)]
    pub cosmetic: Cosmetic,
}

/// Broadcast payloads, tagged with the sender so echoes can be dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Broadcast {
    Chat { id: String, message: String },
    Emote { id: String, emote: Emote },
    Cosmetic { id: String, cosmetic: Cosmetic },
}

impl Broadcast {
    pub fn sender(&self) -> &str {
        match self {
            Broadcast::Chat { id, .. } | Broadcast::Emote { id, .. } | Broadcast::Cosmetic { id, .. } => id,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Something said or emoted, with the time it arrived
#[derive(Debug, Clone, PartialEq)]
pub enum Bubble {
    Text(String),
    Emote(Emote),
}

/// One avatar in the room
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub id: String,
    pub pos: Vec2,
    pub bob_offset: f32,
    pub cosmetic: Cosmetic,
    pub bubble: Option<(Bubble, u64)>,
}

impl Avatar {
    fn from_presence(id: &str, presence: &Presence) -> Self {
        Self {
            id: id.to_string(),
            pos: Vec2::new(presence.x, presence.y),
            bob_offset: presence.bob_offset,
            cosmetic: presence.cosmetic,
            bubble: None,
        }
    }

    pub fn presence(&self) -> Presence {
        Presence {
            x: self.pos.x,
            y: self.pos.y,
            bob_offset: self.bob_offset,
            cosmetic: self.cosmetic,
        }
    }

    /// Current bubble and its opacity, if still visible
    pub fn visible_bubble(&self, now_ms: u64) -> Option<(&Bubble, f32)> {
        let (bubble, at) = self.bubble.as_ref()?;
        let opacity = bubble_opacity(*at, now_ms)?;
        Some((bubble, opacity))
    }
}

/// Opacity of a bubble posted at `message_ms`, or None once it has expired
///
/// Fully opaque for the first five seconds, then fades linearly.
pub fn bubble_opacity(message_ms: u64, now_ms: u64) -> Option<f32> {
    let elapsed = now_ms.saturating_sub(message_ms);
    if elapsed > BUBBLE_DURATION_MS {
        return None;
    }
    let fade_start = BUBBLE_DURATION_MS - BUBBLE_FADE_MS;
    if elapsed <= fade_start {
        return Some(1.0);
    }
    let t = (elapsed - fade_start) as f32 / BUBBLE_FADE_MS as f32;
    Some((1.0 - t).max(0.0))
}

/// Lobby roster: the local avatar plus everyone else by sender id
#[derive(Debug, Clone)]
pub struct Lobby {
    pub me: Avatar,
    pub others: BTreeMap<String, Avatar>,
}

impl Lobby {
    pub fn new(id: impl Into<String>, presence: Presence) -> Self {
        let id = id.into();
        Self {
            me: Avatar::from_presence(&id, &presence),
            others: BTreeMap::new(),
        }
    }

    /// Full presence snapshot: replace the roster, skipping ourselves
    pub fn on_sync<'a>(&mut self, snapshot: impl IntoIterator<Item = (&'a str, Presence)>) {
        self.others = snapshot
            .into_iter()
            .filter(|(id, _)| *id != self.me.id)
            .map(|(id, p)| (id.to_string(), Avatar::from_presence(id, &p)))
            .collect();
        log::info!("Lobby synced: {}", self.online_label());
    }

    pub fn on_join(&mut self, id: &str, presence: Presence) {
        if id == self.me.id {
            return;
        }
        self.others
            .insert(id.to_string(), Avatar::from_presence(id, &presence));
        log::info!("{} joined ({})", id, self.online_label());
    }

    pub fn on_leave(&mut self, id: &str) {
        if self.others.remove(id).is_some() {
            log::info!("{} left ({})", id, self.online_label());
        }
    }

    /// Apply a peer broadcast. Our own echoes and unknown senders are ignored.
    ///
    /// Returns true if the roster changed.
    pub fn on_broadcast(&mut self, event: &Broadcast, now_ms: u64) -> bool {
        if event.sender() == self.me.id {
            return false;
        }
        let Some(avatar) = self.others.get_mut(event.sender()) else {
            log::debug!("Broadcast from unknown peer {}", event.sender());
            return false;
        };
        match event {
            Broadcast::Chat { message, .. } => {
                avatar.bubble = Some((Bubble::Text(message.clone()), now_ms));
            }
            Broadcast::Emote { emote, .. } => {
                avatar.bubble = Some((Bubble::Emote(*emote), now_ms));
            }
            Broadcast::Cosmetic { cosmetic, .. } => {
                avatar.cosmetic = *cosmetic;
            }
        }
        true
    }

    /// Post a chat line. Blank input is a no-op.
    pub fn say(&mut self, text: &str, now_ms: u64) -> Option<Broadcast> {
        let message: String = text.trim().chars().take(MAX_MESSAGE_LEN).collect();
        if message.is_empty() {
            return None;
        }
        self.me.bubble = Some((Bubble::Text(message.clone()), now_ms));
        Some(Broadcast::Chat {
            id: self.me.id.clone(),
            message,
        })
    }

    pub fn emote(&mut self, emote: Emote, now_ms: u64) -> Broadcast {
        self.me.bubble = Some((Bubble::Emote(emote), now_ms));
        Broadcast::Emote {
            id: self.me.id.clone(),
            emote,
        }
    }

    /// Put on a cosmetic if enough time has been played
    pub fn wear(&mut self, cosmetic: Cosmetic, time_played_ms: u64) -> Option<Broadcast> {
        if !cosmetic.is_unlocked(time_played_ms) {
            log::warn!("{:?} is still locked", cosmetic);
            return None;
        }
        self.me.cosmetic = cosmetic;
        Some(Broadcast::Cosmetic {
            id: self.me.id.clone(),
            cosmetic,
        })
    }

    /// Drop bubbles that have run their course
    pub fn expire_bubbles(&mut self, now_ms: u64) {
        for avatar in std::iter::once(&mut self.me).chain(self.others.values_mut()) {
            if let Some((_, at)) = avatar.bubble {
                if bubble_opacity(at, now_ms).is_none() {
                    avatar.bubble = None;
                }
            }
        }
    }

    /// Peers plus ourselves
    pub fn online_count(&self) -> usize {
        self.others.len() + 1
    }

    pub fn online_label(&self) -> String {
        format!("{} here", self.online_count())
    }
}
