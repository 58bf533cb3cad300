//! The append-only event log contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curiosity_rules::CuriosityId;
use std::collections::HashSet;

use super::{CuriosityEvent, EntitySnapshot, EventId, EventType};
use crate::error::EventLogResult;

/// Paging window for reverse-chronological reads. A `limit` of 0 means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

impl QueryWindow {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        if self.limit == 0 {
            iter.collect()
        } else {
            iter.take(self.limit).collect()
        }
    }
}

/// Append-only, queryable, replayable store of curiosity events.
///
/// Implementations must preserve append order per entity and per child,
/// reject events without reasoning, and make `append_batch` all-or-nothing.
/// Time-ordered queries break timestamp ties by append position.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event.
    async fn append(&self, event: CuriosityEvent) -> EventLogResult<()>;

    /// Append several events atomically.
    async fn append_batch(&self, events: Vec<CuriosityEvent>) -> EventLogResult<()>;

    /// Record the cascade side-effects of an already appended event.
    ///
    /// This is the only change ever applied to a stored event.
    async fn link_triggered_events(
        &self,
        parent: EventId,
        children: Vec<EventId>,
    ) -> EventLogResult<()>;

    async fn get_event(&self, id: EventId) -> EventLogResult<Option<CuriosityEvent>>;

    /// Events about one entity, oldest first.
    async fn get_events_for_entity(
        &self,
        entity_id: CuriosityId,
    ) -> EventLogResult<Vec<CuriosityEvent>>;

    /// Events for one child, newest first.
    async fn get_events_for_child(
        &self,
        child_id: &str,
        window: QueryWindow,
    ) -> EventLogResult<Vec<CuriosityEvent>>;

    /// Events of one session, oldest first.
    async fn get_events_in_session(&self, session_id: &str)
        -> EventLogResult<Vec<CuriosityEvent>>;

    /// Events for one child within `[start, end]`, oldest first.
    async fn get_events_between(
        &self,
        child_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EventLogResult<Vec<CuriosityEvent>>;

    /// Events of one type for one child, newest first. A `limit` of 0 means unbounded.
    async fn get_events_by_type(
        &self,
        child_id: &str,
        event_type: EventType,
        limit: usize,
    ) -> EventLogResult<Vec<CuriosityEvent>>;

    /// The event and everything it transitively triggered, depth-first.
    async fn get_cascade_chain(&self, event_id: EventId) -> EventLogResult<Vec<CuriosityEvent>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![event_id];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(event) = self.get_event(id).await? else {
                continue;
            };
            stack.extend(event.triggered_events.iter().rev().copied());
            chain.push(event);
        }

        Ok(chain)
    }

    /// Rebuild an entity's fields as they stood at `at`.
    async fn reconstruct_entity_at(
        &self,
        entity_id: CuriosityId,
        at: DateTime<Utc>,
    ) -> EventLogResult<EntitySnapshot> {
        let events = self.get_events_for_entity(entity_id).await?;
        Ok(EntitySnapshot::replay(entity_id, at, &events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_window() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(QueryWindow::all().apply(items.clone()).len(), 10);
        assert_eq!(QueryWindow::new(3, 2).apply(items.clone()), vec![2, 3, 4]);
        assert!(QueryWindow::new(5, 20).apply(items).is_empty());
    }
}
