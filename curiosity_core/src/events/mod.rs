//! Event sourcing for curiosity state changes.
//!
//! Every change to a curiosity is captured as an immutable [`CuriosityEvent`]
//! with a mandatory reasoning string. Events are appended to an [`EventLog`],
//! usually through an [`EventRecorder`], and cascade side-effects point back
//! to the event that triggered them.

mod jsonl;
mod log;
mod memory;
mod recorder;

pub use jsonl::*;
pub use log::*;
pub use memory::*;
pub use recorder::*;

use chrono::{DateTime, Utc};
use curiosity_rules::{CuriosityId, CuriosityKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{EventLogError, EventLogResult};

/// Unique identifier for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of change an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    /// A curiosity turned into a successor (question → hypothesis, theory → theory).
    Evolved,
    Confirmed,
    Refuted,
    Dormant,
    Revived,
    EvidenceAdded,
    PatternEmerged,
    PatternStrengthened,
    PatternQuestioned,
    PatternDissolved,
    SynthesisRecorded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Updated => "updated",
            EventType::Evolved => "evolved",
            EventType::Confirmed => "confirmed",
            EventType::Refuted => "refuted",
            EventType::Dormant => "dormant",
            EventType::Revived => "revived",
            EventType::EvidenceAdded => "evidence_added",
            EventType::PatternEmerged => "pattern_emerged",
            EventType::PatternStrengthened => "pattern_strengthened",
            EventType::PatternQuestioned => "pattern_questioned",
            EventType::PatternDissolved => "pattern_dissolved",
            EventType::SynthesisRecorded => "synthesis_recorded",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which family of entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Curiosity,
    Pattern,
}

impl EntityType {
    /// Patterns are tracked as their own entity family; everything else is a curiosity.
    pub fn of(kind: CuriosityKind) -> Self {
        match kind {
            CuriosityKind::Pattern => EntityType::Pattern,
            _ => EntityType::Curiosity,
        }
    }
}

/// One field's before/after values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from_value: Value,
    pub to_value: Value,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            from_value: from.into(),
            to_value: to.into(),
        }
    }

    /// A change, or `None` when the value did not actually move.
    pub fn diff(
        field: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Option<Self> {
        let change = Self::new(field, from, to);
        (change.from_value != change.to_value).then_some(change)
    }
}

/// Field changes keyed by field name.
pub type Changes = BTreeMap<String, FieldChange>;

/// Collect changes into a [`Changes`] map.
pub fn changes_from(changes: impl IntoIterator<Item = FieldChange>) -> Changes {
    changes
        .into_iter()
        .map(|change| (change.field.clone(), change))
        .collect()
}

/// An immutable record of one set of field changes to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuriosityEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub entity_type: EntityType,
    pub entity_id: CuriosityId,

    #[serde(default)]
    pub changes: Changes,

    /// Why the change happened. Never empty.
    pub reasoning: String,

    /// Observations supporting the change.
    #[serde(default)]
    pub evidence_refs: Vec<String>,

    pub session_id: String,
    pub child_id: String,
    pub timestamp: DateTime<Utc>,

    /// Parent event when this is a cascade side-effect.
    #[serde(default)]
    pub triggered_by: Option<EventId>,

    /// Cascade side-effects of this event, filled once the cascade completes.
    #[serde(default)]
    pub triggered_events: Vec<EventId>,
}

impl CuriosityEvent {
    /// Create a new event about an entity.
    pub fn new(
        event_type: EventType,
        entity_type: EntityType,
        entity_id: CuriosityId,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            entity_type,
            entity_id,
            changes: Changes::new(),
            reasoning: reasoning.into(),
            evidence_refs: Vec::new(),
            session_id: String::new(),
            child_id: String::new(),
            timestamp: Utc::now(),
            triggered_by: None,
            triggered_events: Vec::new(),
        }
    }

    /// Add a field change.
    pub fn with_change(mut self, change: FieldChange) -> Self {
        self.changes.insert(change.field.clone(), change);
        self
    }

    /// Add several field changes.
    pub fn with_changes(mut self, changes: impl IntoIterator<Item = FieldChange>) -> Self {
        self.changes.extend(changes_from(changes));
        self
    }

    /// Attach supporting observation ids.
    pub fn with_evidence_refs(mut self, refs: impl IntoIterator<Item = String>) -> Self {
        self.evidence_refs.extend(refs);
        self
    }

    /// Bind to a session and child.
    pub fn with_context(mut self, session_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self.child_id = child_id.into();
        self
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Mark as a side-effect of another event.
    pub fn with_triggered_by(mut self, parent: EventId) -> Self {
        self.triggered_by = Some(parent);
        self
    }

    /// Whether this event is a cascade side-effect.
    pub fn is_cascade(&self) -> bool {
        self.triggered_by.is_some()
    }

    /// Enforce the reasoning contract.
    pub fn validate(&self) -> EventLogResult<()> {
        if self.reasoning.trim().is_empty() {
            return Err(EventLogError::MissingReasoning(self.id));
        }
        Ok(())
    }
}

/// Point-in-time state of one entity, rebuilt from its events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: CuriosityId,
    pub as_of: DateTime<Utc>,
    pub fields: BTreeMap<String, Value>,
    /// Number of events replayed.
    pub applied_events: usize,
}

impl EntitySnapshot {
    /// Replay events in order, last write wins per field. Events after `as_of` are ignored.
    pub fn replay<'a>(
        entity_id: CuriosityId,
        as_of: DateTime<Utc>,
        events: impl IntoIterator<Item = &'a CuriosityEvent>,
    ) -> Self {
        let mut snapshot = Self {
            entity_id,
            as_of,
            fields: BTreeMap::new(),
            applied_events: 0,
        };
        for event in events {
            if event.entity_id != entity_id || event.timestamp > as_of {
                continue;
            }
            for (field, change) in &event.changes {
                snapshot.fields.insert(field.clone(), change.to_value.clone());
            }
            snapshot.applied_events += 1;
        }
        snapshot
    }

    /// Read one field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether no field has been populated.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_event_builder() {
        let entity = CuriosityId::new();
        let event = CuriosityEvent::new(EventType::Updated, EntityType::Curiosity, entity, "more context")
            .with_change(FieldChange::new("pull", 0.4, 0.6))
            .with_evidence_refs(vec!["obs-7".to_string()])
            .with_context("session-1", "child-1");

        assert_eq!(event.entity_id, entity);
        assert_eq!(event.changes["pull"].to_value, 0.6);
        assert_eq!(event.evidence_refs, vec!["obs-7"]);
        assert_eq!(event.child_id, "child-1");
        assert!(!event.is_cascade());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_blank_reasoning_rejected() {
        let event = CuriosityEvent::new(EventType::Created, EntityType::Curiosity, CuriosityId::new(), "  ");
        assert!(matches!(
            event.validate(),
            Err(EventLogError::MissingReasoning(id)) if id == event.id
        ));
    }

    #[test]
    fn test_diff_skips_unchanged_values() {
        assert!(FieldChange::diff("status", "open", "open").is_none());
        let change = FieldChange::diff("status", "open", "partial").unwrap();
        assert_eq!(change.from_value, "open");
        assert_eq!(change.to_value, "partial");
    }

    #[test]
    fn test_entity_type_routing() {
        assert_eq!(EntityType::of(CuriosityKind::Pattern), EntityType::Pattern);
        assert_eq!(EntityType::of(CuriosityKind::Question), EntityType::Curiosity);
    }

    #[test]
    fn test_replay_last_write_wins() {
        let entity = CuriosityId::new();
        let t0 = Utc::now();
        let first = CuriosityEvent::new(EventType::Created, EntityType::Curiosity, entity, "proposed")
            .with_change(FieldChange::new("status", Value::Null, "open"))
            .with_change(FieldChange::new("fullness", Value::Null, 0.2))
            .with_timestamp(t0);
        let second = CuriosityEvent::new(EventType::Updated, EntityType::Curiosity, entity, "answered a bit")
            .with_change(FieldChange::new("status", "open", "partial"))
            .with_timestamp(t0 + Duration::hours(1));

        let events = [first, second];
        let midway = EntitySnapshot::replay(entity, t0 + Duration::minutes(30), &events);
        assert_eq!(midway.get("status"), Some(&Value::from("open")));
        assert_eq!(midway.applied_events, 1);

        let latest = EntitySnapshot::replay(entity, t0 + Duration::hours(2), &events);
        assert_eq!(latest.get("status"), Some(&Value::from("partial")));
        assert_eq!(latest.get("fullness"), Some(&Value::from(0.2)));

        let before = EntitySnapshot::replay(entity, t0 - Duration::seconds(1), &events);
        assert!(before.is_empty());
        assert_eq!(before.entity_id, entity);
    }
}
