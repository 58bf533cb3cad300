//! In-memory event log, plus the index shared with durable backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curiosity_rules::CuriosityId;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

use super::{CuriosityEvent, EventId, EventLog, EventType, QueryWindow};
use crate::error::{EventLogError, EventLogResult};

/// Append-ordered events with an id index.
#[derive(Debug, Default)]
pub(crate) struct EventIndex {
    events: Vec<CuriosityEvent>,
    positions: HashMap<EventId, usize>,
}

impl EventIndex {
    /// Validate a batch without touching the index.
    pub(crate) fn check_batch(&self, events: &[CuriosityEvent]) -> EventLogResult<()> {
        let mut batch_ids = HashSet::new();
        for event in events {
            event.validate()?;
            if self.positions.contains_key(&event.id) || !batch_ids.insert(event.id) {
                return Err(EventLogError::DuplicateEvent(event.id));
            }
        }
        Ok(())
    }

    /// Insert a batch that already passed [`EventIndex::check_batch`].
    pub(crate) fn insert_batch(&mut self, events: Vec<CuriosityEvent>) {
        for event in events {
            self.positions.insert(event.id, self.events.len());
            self.events.push(event);
        }
    }

    pub(crate) fn check_link(&self, parent: EventId) -> EventLogResult<()> {
        if self.positions.contains_key(&parent) {
            Ok(())
        } else {
            Err(EventLogError::NotFound(parent))
        }
    }

    pub(crate) fn link(&mut self, parent: EventId, children: &[EventId]) -> EventLogResult<()> {
        let position = *self
            .positions
            .get(&parent)
            .ok_or(EventLogError::NotFound(parent))?;
        let event = &mut self.events[position];
        for child in children {
            if !event.triggered_events.contains(child) {
                event.triggered_events.push(*child);
            }
        }
        Ok(())
    }

    pub(crate) fn get(&self, id: EventId) -> Option<CuriosityEvent> {
        self.positions.get(&id).map(|&pos| self.events[pos].clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Matching events, oldest first, ordered by `(timestamp, append position)`.
    fn chronological<F>(&self, predicate: F) -> Vec<CuriosityEvent>
    where
        F: Fn(&CuriosityEvent) -> bool,
    {
        let mut matching: Vec<(usize, &CuriosityEvent)> = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| predicate(e))
            .collect();
        matching.sort_by_key(|&(position, e)| (e.timestamp, position));
        matching.into_iter().map(|(_, e)| e.clone()).collect()
    }

    /// Matching events, newest first. Ties put the later append first.
    fn newest_first<F>(&self, predicate: F) -> Vec<CuriosityEvent>
    where
        F: Fn(&CuriosityEvent) -> bool,
    {
        let mut events = self.chronological(predicate);
        events.reverse();
        events
    }

    pub(crate) fn for_entity(&self, entity_id: CuriosityId) -> Vec<CuriosityEvent> {
        self.chronological(|e| e.entity_id == entity_id)
    }

    pub(crate) fn for_child(&self, child_id: &str, window: QueryWindow) -> Vec<CuriosityEvent> {
        window.apply(self.newest_first(|e| e.child_id == child_id))
    }

    pub(crate) fn in_session(&self, session_id: &str) -> Vec<CuriosityEvent> {
        self.chronological(|e| e.session_id == session_id)
    }

    pub(crate) fn between(
        &self,
        child_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<CuriosityEvent> {
        self.chronological(|e| e.child_id == child_id && e.timestamp >= start && e.timestamp <= end)
    }

    pub(crate) fn by_type(
        &self,
        child_id: &str,
        event_type: EventType,
        limit: usize,
    ) -> Vec<CuriosityEvent> {
        QueryWindow::new(limit, 0)
            .apply(self.newest_first(|e| e.child_id == child_id && e.event_type == event_type))
    }
}

/// In-memory event log for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    index: RwLock<EventIndex>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.index.read().map(|index| index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&EventIndex) -> T) -> EventLogResult<T> {
        let guard = self
            .index
            .read()
            .map_err(|_| EventLogError::Backend("event index lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut EventIndex) -> EventLogResult<T>,
    ) -> EventLogResult<T> {
        let mut guard = self
            .index
            .write()
            .map_err(|_| EventLogError::Backend("event index lock poisoned".to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: CuriosityEvent) -> EventLogResult<()> {
        self.append_batch(vec![event]).await
    }

    async fn append_batch(&self, events: Vec<CuriosityEvent>) -> EventLogResult<()> {
        let count = events.len();
        self.write(|index| {
            index.check_batch(&events)?;
            index.insert_batch(events);
            Ok(())
        })?;
        debug!(count, "Appended curiosity events");
        Ok(())
    }

    async fn link_triggered_events(
        &self,
        parent: EventId,
        children: Vec<EventId>,
    ) -> EventLogResult<()> {
        self.write(|index| index.link(parent, &children))?;
        debug!(parent = %parent, children = children.len(), "Linked cascade events");
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> EventLogResult<Option<CuriosityEvent>> {
        self.read(|index| index.get(id))
    }

    async fn get_events_for_entity(
        &self,
        entity_id: CuriosityId,
    ) -> EventLogResult<Vec<CuriosityEvent>> {
        self.read(|index| index.for_entity(entity_id))
    }

    async fn get_events_for_child(
        &self,
        child_id: &str,
        window: QueryWindow,
    ) -> EventLogResult<Vec<CuriosityEvent>> {
        self.read(|index| index.for_child(child_id, window))
    }

    async fn get_events_in_session(
        &self,
        session_id: &str,
    ) -> EventLogResult<Vec<CuriosityEvent>> {
        self.read(|index| index.in_session(session_id))
    }

    async fn get_events_between(
        &self,
        child_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EventLogResult<Vec<CuriosityEvent>> {
        self.read(|index| index.between(child_id, start, end))
    }

    async fn get_events_by_type(
        &self,
        child_id: &str,
        event_type: EventType,
        limit: usize,
    ) -> EventLogResult<Vec<CuriosityEvent>> {
        self.read(|index| index.by_type(child_id, event_type, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EntityType, FieldChange};
    use chrono::Duration;

    fn event_at(
        entity: CuriosityId,
        event_type: EventType,
        child: &str,
        timestamp: DateTime<Utc>,
    ) -> CuriosityEvent {
        CuriosityEvent::new(event_type, EntityType::Curiosity, entity, "observed in session")
            .with_context("session-1", child)
            .with_timestamp(timestamp)
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let log = InMemoryEventLog::new();
        let event = event_at(CuriosityId::new(), EventType::Created, "child-1", Utc::now());
        let id = event.id;

        log.append(event).await.unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log.get_event(id).await.unwrap().unwrap().id, id);
        assert!(log.get_event(EventId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_reasoning_rejected() {
        let log = InMemoryEventLog::new();
        let event = CuriosityEvent::new(EventType::Created, EntityType::Curiosity, CuriosityId::new(), "");

        let result = log.append(event).await;
        assert!(matches!(result, Err(EventLogError::MissingReasoning(_))));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let log = InMemoryEventLog::new();
        let entity = CuriosityId::new();
        let good = event_at(entity, EventType::Updated, "child-1", Utc::now());
        let bad = CuriosityEvent::new(EventType::Updated, EntityType::Curiosity, entity, "");

        assert!(log.append_batch(vec![good.clone(), bad]).await.is_err());
        assert!(log.is_empty());

        log.append(good.clone()).await.unwrap();
        let result = log.append(good).await;
        assert!(matches!(result, Err(EventLogError::DuplicateEvent(_))));
    }

    #[tokio::test]
    async fn test_ordering_queries() {
        let log = InMemoryEventLog::new();
        let entity = CuriosityId::new();
        let t0 = Utc::now();

        let created = event_at(entity, EventType::Created, "child-1", t0);
        let updated = event_at(entity, EventType::Updated, "child-1", t0 + Duration::minutes(5))
            .with_change(FieldChange::new("pull", 0.5, 0.6));
        let other_child = event_at(CuriosityId::new(), EventType::Created, "child-2", t0);
        // Appended out of time order on purpose.
        log.append_batch(vec![updated.clone(), created.clone(), other_child])
            .await
            .unwrap();

        let for_entity = log.get_events_for_entity(entity).await.unwrap();
        assert_eq!(for_entity[0].id, created.id);
        assert_eq!(for_entity[1].id, updated.id);

        let for_child = log.get_events_for_child("child-1", QueryWindow::all()).await.unwrap();
        assert_eq!(for_child.len(), 2);
        assert_eq!(for_child[0].id, updated.id);

        let paged = log.get_events_for_child("child-1", QueryWindow::new(1, 1)).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, created.id);

        let between = log
            .get_events_between("child-1", t0 + Duration::minutes(1), t0 + Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].id, updated.id);

        let by_type = log.get_events_by_type("child-1", EventType::Created, 0).await.unwrap();
        assert_eq!(by_type.len(), 1);

        let session = log.get_events_in_session("session-1").await.unwrap();
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_append_order() {
        let log = InMemoryEventLog::new();
        let entity = CuriosityId::new();
        let now = Utc::now();
        let events: Vec<_> = (0..5)
            .map(|_| event_at(entity, EventType::Updated, "child-1", now))
            .collect();
        let appended: Vec<_> = events.iter().map(|e| e.id).collect();
        for event in events {
            log.append(event).await.unwrap();
        }

        let oldest_first: Vec<_> = log
            .get_events_for_entity(entity)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(oldest_first, appended);

        let mut newest_first: Vec<_> = log
            .get_events_for_child("child-1", QueryWindow::all())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        newest_first.reverse();
        assert_eq!(newest_first, appended);
    }

    #[tokio::test]
    async fn test_cascade_chain_depth_first() {
        let log = InMemoryEventLog::new();
        let now = Utc::now();
        let root = event_at(CuriosityId::new(), EventType::Refuted, "child-1", now);
        let a = event_at(CuriosityId::new(), EventType::Updated, "child-1", now).with_triggered_by(root.id);
        let a1 = event_at(CuriosityId::new(), EventType::Updated, "child-1", now).with_triggered_by(a.id);
        let b = event_at(CuriosityId::new(), EventType::PatternQuestioned, "child-1", now)
            .with_triggered_by(root.id);

        log.append_batch(vec![root.clone(), a.clone(), a1.clone(), b.clone()])
            .await
            .unwrap();
        log.link_triggered_events(root.id, vec![a.id, b.id]).await.unwrap();
        log.link_triggered_events(a.id, vec![a1.id]).await.unwrap();

        let chain: Vec<_> = log
            .get_cascade_chain(root.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(chain, vec![root.id, a.id, a1.id, b.id]);

        let leaf = log.get_cascade_chain(b.id).await.unwrap();
        assert_eq!(leaf.len(), 1);
    }

    #[tokio::test]
    async fn test_link_unknown_parent() {
        let log = InMemoryEventLog::new();
        let result = log.link_triggered_events(EventId::new(), vec![EventId::new()]).await;
        assert!(matches!(result, Err(EventLogError::NotFound(_))));
    }
}
