//! Curiosity entity definitions.

mod curiosity;
mod variants;

pub use curiosity::*;
pub use variants::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for all curiosities, regardless of variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CuriosityId(pub Uuid);

impl CuriosityId {
    /// Create a new random curiosity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a curiosity ID from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CuriosityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CuriosityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four curiosity variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuriosityKind {
    Discovery,
    Question,
    Hypothesis,
    Pattern,
}

impl CuriosityKind {
    /// All variants, in lineage order.
    pub const ALL: [CuriosityKind; 4] = [
        CuriosityKind::Discovery,
        CuriosityKind::Question,
        CuriosityKind::Hypothesis,
        CuriosityKind::Pattern,
    ];

    /// Which certainty measure applies to this variant.
    pub fn nature(&self) -> Nature {
        match self {
            CuriosityKind::Discovery | CuriosityKind::Question => Nature::Receptive,
            CuriosityKind::Hypothesis | CuriosityKind::Pattern => Nature::Assertive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CuriosityKind::Discovery => "discovery",
            CuriosityKind::Question => "question",
            CuriosityKind::Hypothesis => "hypothesis",
            CuriosityKind::Pattern => "pattern",
        }
    }

    /// Parse a variant discriminator tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl std::fmt::Display for CuriosityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Behavioral split between variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nature {
    /// Measured by fullness: how complete the picture is.
    Receptive,
    /// Measured by confidence: how certain the claim is.
    Assertive,
}

impl Nature {
    /// Name of the certainty field for this nature.
    pub fn certainty_field(&self) -> &'static str {
        match self {
            Nature::Receptive => "fullness",
            Nature::Assertive => "confidence",
        }
    }
}

/// Fields shared by every curiosity variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuriosityBase {
    pub id: CuriosityId,

    /// Human-readable key, unique within one store.
    pub focus: String,

    /// Semantic topic tag.
    pub domain: String,

    /// Attention weight (0.0 - 1.0). The only attribute that decays.
    pub pull: f64,

    pub created_at: DateTime<Utc>,

    /// Last reasoned activity.
    pub last_updated: DateTime<Utc>,

    /// Watermark of the last mechanical decay pass.
    #[serde(default)]
    pub last_decayed_at: Option<DateTime<Utc>>,
}

impl CuriosityBase {
    /// Create a new base with the given focus and domain.
    pub fn new(focus: impl Into<String>, domain: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CuriosityId::new(),
            focus: focus.into(),
            domain: domain.into(),
            pull: 0.5,
            created_at: now,
            last_updated: now,
            last_decayed_at: None,
        }
    }

    /// Set pull, clamped to [0, 1].
    pub fn set_pull(&mut self, pull: f64) {
        self.pull = clamp_unit(pull);
    }

    /// Stamp activity.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
    }

    /// Fractional days of inactivity at `now`.
    pub fn days_since_update(&self, now: DateTime<Utc>) -> f64 {
        fractional_days(now - self.last_updated)
    }

    /// Fractional days since pull was last eroded (by decay or by activity).
    pub fn days_since_decay(&self, now: DateTime<Utc>) -> f64 {
        let anchor = match self.last_decayed_at {
            Some(decayed) if decayed > self.last_updated => decayed,
            _ => self.last_updated,
        };
        fractional_days(now - anchor)
    }
}

/// Clamp a unit measure to [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn fractional_days(elapsed: chrono::Duration) -> f64 {
    elapsed.num_milliseconds() as f64 / 86_400_000.0
}
