//! Recording facade bound to one session and child.

use curiosity_rules::{Curiosity, CuriosityKind, Pattern};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::{Changes, CuriosityEvent, EntityType, EventId, EventLog, EventType, FieldChange};
use crate::error::{EventLogError, EventLogResult};

/// Builds and appends events for one `(session_id, child_id)` context.
///
/// A recorder handed out by [`EventRecorder::cascade`] stamps every event it
/// emits with the parent's id and reports what it emitted back to the scope.
#[derive(Clone)]
pub struct EventRecorder {
    log: Arc<dyn EventLog>,
    session_id: String,
    child_id: String,
    parent: Option<EventId>,
    emitted: Option<Arc<Mutex<Vec<EventId>>>>,
    queued: Vec<CuriosityEvent>,
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("session_id", &self.session_id)
            .field("child_id", &self.child_id)
            .field("parent", &self.parent)
            .field("queued", &self.queued.len())
            .finish()
    }
}

impl EventRecorder {
    pub fn new(
        log: Arc<dyn EventLog>,
        session_id: impl Into<String>,
        child_id: impl Into<String>,
    ) -> Self {
        Self {
            log,
            session_id: session_id.into(),
            child_id: child_id.into(),
            parent: None,
            emitted: None,
            queued: Vec::new(),
        }
    }

    pub fn log(&self) -> &Arc<dyn EventLog> {
        &self.log
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn child_id(&self) -> &str {
        &self.child_id
    }

    /// Parent event when this recorder lives inside a cascade scope.
    pub fn parent(&self) -> Option<EventId> {
        self.parent
    }

    /// Events waiting for [`EventRecorder::flush`].
    pub fn pending(&self) -> usize {
        self.queued.len()
    }

    /// Build an event about `curiosity` in this recorder's context.
    pub fn event_for(
        &self,
        event_type: EventType,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> CuriosityEvent {
        let mut event = CuriosityEvent::new(
            event_type,
            EntityType::of(curiosity.kind()),
            curiosity.id(),
            reasoning,
        )
        .with_context(self.session_id.clone(), self.child_id.clone());
        event.changes = changes;
        event
    }

    fn stamp(&self, mut event: CuriosityEvent) -> CuriosityEvent {
        event.session_id = self.session_id.clone();
        event.child_id = self.child_id.clone();
        if let Some(parent) = self.parent {
            event.triggered_by.get_or_insert(parent);
        }
        event
    }

    fn track(&self, ids: impl IntoIterator<Item = EventId>) -> EventLogResult<()> {
        if let Some(emitted) = &self.emitted {
            emitted
                .lock()
                .map_err(|_| EventLogError::Backend("cascade scope lock poisoned".to_string()))?
                .extend(ids);
        }
        Ok(())
    }

    /// Stamp and append an event immediately, returning what was stored.
    pub async fn record(&self, event: CuriosityEvent) -> EventLogResult<CuriosityEvent> {
        let event = self.stamp(event);
        self.log.append(event.clone()).await?;
        self.track([event.id])?;
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            entity_id = %event.entity_id,
            "Recorded event"
        );
        Ok(event)
    }

    /// Hold an event for the next [`EventRecorder::flush`].
    pub fn queue(&mut self, event: CuriosityEvent) {
        let event = self.stamp(event);
        self.queued.push(event);
    }

    /// Append every queued event as one atomic batch.
    ///
    /// On failure the queue is emptied and nothing is appended.
    pub async fn flush(&mut self) -> EventLogResult<Vec<CuriosityEvent>> {
        if self.queued.is_empty() {
            return Ok(Vec::new());
        }
        let events = std::mem::take(&mut self.queued);
        self.log.append_batch(events.clone()).await?;
        self.track(events.iter().map(|e| e.id))?;
        debug!(count = events.len(), "Flushed queued events");
        Ok(events)
    }

    /// Run `scope` with a sub-recorder whose events are triggered by `parent`.
    ///
    /// When the scope ends, successfully or not, every id it emitted is
    /// linked into the parent's `triggered_events`. A failed link is returned
    /// unless the scope itself already failed.
    pub async fn cascade<F, Fut, T, E>(&self, parent: &CuriosityEvent, scope: F) -> Result<T, E>
    where
        F: FnOnce(EventRecorder) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<EventLogError>,
    {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sub = EventRecorder {
            log: self.log.clone(),
            session_id: self.session_id.clone(),
            child_id: self.child_id.clone(),
            parent: Some(parent.id),
            emitted: Some(emitted.clone()),
            queued: Vec::new(),
        };

        let outcome = scope(sub).await;

        let ids = match emitted.lock() {
            Ok(mut ids) => std::mem::take(&mut *ids),
            Err(_) => {
                let err = EventLogError::Backend("cascade scope lock poisoned".to_string());
                return match outcome {
                    Ok(_) => Err(err.into()),
                    Err(e) => Err(e),
                };
            }
        };

        let linked = if ids.is_empty() {
            Ok(())
        } else {
            self.log.link_triggered_events(parent.id, ids.clone()).await
        };

        match (outcome, linked) {
            (Ok(value), Ok(())) => {
                debug!(parent = %parent.id, children = ids.len(), "Closed cascade scope");
                Ok(value)
            }
            (Ok(_), Err(link_err)) => Err(link_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(link_err)) => {
                warn!(parent = %parent.id, error = %link_err, "Failed to link cascade events after scope error");
                Err(e)
            }
        }
    }

    /// Append already built cascade events atomically, triggered by `parent`.
    pub async fn record_cascade(
        &self,
        parent: &CuriosityEvent,
        events: Vec<CuriosityEvent>,
    ) -> EventLogResult<Vec<CuriosityEvent>> {
        self.cascade(parent, |mut sub| async move {
            for event in events {
                sub.queue(event);
            }
            sub.flush().await
        })
        .await
    }

    /// Append `parent` and the events it caused as one atomic batch.
    ///
    /// Both directions of the link are filled in before anything is written,
    /// and the parent goes first so append order follows causation.
    pub async fn record_with_cascade(
        &self,
        parent: CuriosityEvent,
        children: Vec<CuriosityEvent>,
    ) -> EventLogResult<(CuriosityEvent, Vec<CuriosityEvent>)> {
        let mut parent = self.stamp(parent);
        let children: Vec<CuriosityEvent> = children
            .into_iter()
            .map(|event| {
                let mut event = self.stamp(event);
                event.triggered_by = Some(parent.id);
                event
            })
            .collect();
        for child in &children {
            if !parent.triggered_events.contains(&child.id) {
                parent.triggered_events.push(child.id);
            }
        }

        let mut batch = Vec::with_capacity(children.len() + 1);
        batch.push(parent.clone());
        batch.extend(children.iter().cloned());
        self.log.append_batch(batch).await?;
        self.track(std::iter::once(parent.id).chain(children.iter().map(|e| e.id)))?;

        debug!(
            event_id = %parent.id,
            event_type = %parent.event_type,
            children = children.len(),
            "Recorded event with its cascade"
        );
        Ok((parent, children))
    }

    /// The creation event for `curiosity`. Patterns emerge, everything else is created.
    pub fn creation_event(
        &self,
        curiosity: &Curiosity,
        reasoning: impl Into<String>,
    ) -> CuriosityEvent {
        let event_type = match curiosity.kind() {
            CuriosityKind::Pattern => EventType::PatternEmerged,
            _ => EventType::Created,
        };
        self.event_for(event_type, curiosity, creation_changes(curiosity), reasoning)
    }

    /// Record an event of any type about `curiosity`.
    pub async fn record_change(
        &self,
        event_type: EventType,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record(self.event_for(event_type, curiosity, changes, reasoning))
            .await
    }

    /// Creation carries every field of the new entity.
    pub async fn record_created(
        &self,
        curiosity: &Curiosity,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record(self.creation_event(curiosity, reasoning)).await
    }

    pub async fn record_update(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_change(EventType::Updated, curiosity, changes, reasoning)
            .await
    }

    pub async fn record_evolution(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_change(EventType::Evolved, curiosity, changes, reasoning)
            .await
    }

    pub async fn record_confirmation(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_change(EventType::Confirmed, curiosity, changes, reasoning)
            .await
    }

    pub async fn record_refutation(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_change(EventType::Refuted, curiosity, changes, reasoning)
            .await
    }

    pub async fn record_dormancy(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_change(EventType::Dormant, curiosity, changes, reasoning)
            .await
    }

    pub async fn record_revival(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_change(EventType::Revived, curiosity, changes, reasoning)
            .await
    }

    /// Evidence events carry the observations that were assessed.
    pub async fn record_evidence(
        &self,
        curiosity: &Curiosity,
        changes: Changes,
        evidence_refs: Vec<String>,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        let event = self
            .event_for(EventType::EvidenceAdded, curiosity, changes, reasoning)
            .with_evidence_refs(evidence_refs);
        self.record(event).await
    }

    pub async fn record_pattern_emerged(
        &self,
        pattern: &Pattern,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        let curiosity = Curiosity::Pattern(pattern.clone());
        self.record_change(
            EventType::PatternEmerged,
            &curiosity,
            creation_changes(&curiosity),
            reasoning,
        )
        .await
    }

    pub async fn record_pattern_strengthened(
        &self,
        pattern: &Pattern,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_pattern(EventType::PatternStrengthened, pattern, changes, reasoning)
            .await
    }

    pub async fn record_pattern_questioned(
        &self,
        pattern: &Pattern,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_pattern(EventType::PatternQuestioned, pattern, changes, reasoning)
            .await
    }

    pub async fn record_pattern_dissolved(
        &self,
        pattern: &Pattern,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        self.record_pattern(EventType::PatternDissolved, pattern, changes, reasoning)
            .await
    }

    /// A synthesis summary drawn from `curiosity`, e.g. a pattern written up for a report.
    pub async fn record_synthesis(
        &self,
        curiosity: &Curiosity,
        synthesis: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        let changes = Changes::from([(
            "synthesis".to_string(),
            FieldChange::new("synthesis", Value::Null, synthesis.into()),
        )]);
        self.record_change(EventType::SynthesisRecorded, curiosity, changes, reasoning)
            .await
    }

    async fn record_pattern(
        &self,
        event_type: EventType,
        pattern: &Pattern,
        changes: Changes,
        reasoning: impl Into<String>,
    ) -> EventLogResult<CuriosityEvent> {
        let event = CuriosityEvent::new(event_type, EntityType::Pattern, pattern.base.id, reasoning)
            .with_changes(changes.into_values());
        self.record(event).await
    }
}

/// Every field of a new entity, changing from nothing.
pub fn creation_changes(curiosity: &Curiosity) -> Changes {
    curiosity
        .field_map()
        .into_iter()
        .map(|(field, value)| {
            let change = FieldChange::new(field.clone(), Value::Null, value);
            (field, change)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{changes_from, InMemoryEventLog};
    use curiosity_rules::{Hypothesis, Question};

    fn recorder() -> (Arc<InMemoryEventLog>, EventRecorder) {
        let log = Arc::new(InMemoryEventLog::new());
        let recorder = EventRecorder::new(log.clone(), "session-1", "child-1");
        (log, recorder)
    }

    #[tokio::test]
    async fn test_record_created_carries_fields() {
        let (log, recorder) = recorder();
        let question: Curiosity = Question::new("why-rain", "weather", "Why does it rain?")
            .with_fullness(0.2)
            .into();

        let event = recorder.record_created(&question, "child asked twice").await.unwrap();

        assert_eq!(event.event_type, EventType::Created);
        assert_eq!(event.child_id, "child-1");
        assert_eq!(event.changes["focus"].to_value, "why-rain");
        assert_eq!(event.changes["fullness"].to_value, 0.2);
        assert!(event.changes["fullness"].from_value.is_null());
        assert!(!event.changes.contains_key("id"));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_queue_and_flush() {
        let (log, mut recorder) = recorder();
        let hypothesis: Curiosity = Hypothesis::new("h", "music", "music calms").into();

        recorder.queue(recorder.event_for(EventType::Updated, &hypothesis, Changes::new(), "one"));
        recorder.queue(recorder.event_for(EventType::Updated, &hypothesis, Changes::new(), "two"));
        assert_eq!(recorder.pending(), 2);
        assert!(log.is_empty());

        let flushed = recorder.flush().await.unwrap();
        assert_eq!(flushed.len(), 2);
        assert_eq!(recorder.pending(), 0);
        assert_eq!(log.len(), 2);
        assert!(recorder.flush().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cascade_scope_links_parent() {
        let (log, recorder) = recorder();
        let hypothesis: Curiosity = Hypothesis::new("h", "music", "music calms").into();
        let question: Curiosity = Question::new("q", "music", "does music calm?").into();

        let parent = recorder
            .record_confirmation(&hypothesis, Changes::new(), "three supporting observations")
            .await
            .unwrap();

        let child = recorder
            .cascade(&parent, |sub| async move {
                let changes = changes_from([FieldChange::new("status", "open", "answered")]);
                sub.record_update(&question, changes, "answered by confirmed hypothesis")
                    .await
            })
            .await
            .unwrap();

        assert_eq!(child.triggered_by, Some(parent.id));
        let stored_parent = log.get_event(parent.id).await.unwrap().unwrap();
        assert_eq!(stored_parent.triggered_events, vec![child.id]);
    }

    #[tokio::test]
    async fn test_cascade_links_on_failure() {
        let (log, recorder) = recorder();
        let hypothesis: Curiosity = Hypothesis::new("h", "music", "music calms").into();

        let parent = recorder
            .record_refutation(&hypothesis, Changes::new(), "clear counterexample")
            .await
            .unwrap();

        let result: EventLogResult<()> = recorder
            .cascade(&parent, |sub| async move {
                sub.record_update(&hypothesis, Changes::new(), "first ripple").await?;
                sub.record_update(&hypothesis, Changes::new(), "").await?;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(EventLogError::MissingReasoning(_))));
        let stored_parent = log.get_event(parent.id).await.unwrap().unwrap();
        assert_eq!(stored_parent.triggered_events.len(), 1);
    }

    #[tokio::test]
    async fn test_record_with_cascade_links_both_ways() {
        let (log, recorder) = recorder();
        let hypothesis: Curiosity = Hypothesis::new("h", "music", "music calms").into();
        let question: Curiosity = Question::new("q", "music", "does music calm?").into();

        let parent = recorder.event_for(EventType::Confirmed, &hypothesis, Changes::new(), "confirmed");
        let ripple = vec![recorder.event_for(EventType::Updated, &question, Changes::new(), "answered")];
        let (parent, children) = recorder.record_with_cascade(parent, ripple).await.unwrap();

        assert_eq!(children[0].triggered_by, Some(parent.id));
        assert_eq!(parent.triggered_events, vec![children[0].id]);
        let stored = log.get_event(parent.id).await.unwrap().unwrap();
        assert_eq!(stored.triggered_events, vec![children[0].id]);
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_record_with_cascade_writes_nothing_on_rejection() {
        let (log, recorder) = recorder();
        let hypothesis: Curiosity = Hypothesis::new("h", "music", "music calms").into();

        let parent = recorder.event_for(EventType::Refuted, &hypothesis, Changes::new(), "refuted");
        let ripple = vec![recorder.event_for(EventType::Updated, &hypothesis, Changes::new(), " ")];
        let result = recorder.record_with_cascade(parent, ripple).await;

        assert!(matches!(result, Err(EventLogError::MissingReasoning(_))));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_record_cascade_batch() {
        let (log, recorder) = recorder();
        let hypothesis: Curiosity = Hypothesis::new("h", "music", "music calms").into();
        let parent = recorder
            .record_confirmation(&hypothesis, Changes::new(), "confirmed")
            .await
            .unwrap();

        let ripple = vec![
            recorder.event_for(EventType::Updated, &hypothesis, Changes::new(), "a"),
            recorder.event_for(EventType::Updated, &hypothesis, Changes::new(), "b"),
        ];
        let stored = recorder.record_cascade(&parent, ripple).await.unwrap();

        assert!(stored.iter().all(|e| e.triggered_by == Some(parent.id)));
        let chain = log.get_cascade_chain(parent.id).await.unwrap();
        assert_eq!(chain.len(), 3);
    }
}
