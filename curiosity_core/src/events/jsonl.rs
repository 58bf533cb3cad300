//! Durable event log backed by an append-only JSON-lines file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curiosity_rules::CuriosityId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory::EventIndex;
use super::{CuriosityEvent, EventId, EventLog, EventType, QueryWindow};
use crate::error::{EventLogError, EventLogResult};

/// One line of the log file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LogRecord {
    Event(CuriosityEvent),
    /// Events appended together. One line, so a torn write loses all of them.
    Batch(Vec<CuriosityEvent>),
    /// Cascade linkage, folded into the parent event on load.
    Link {
        parent: EventId,
        children: Vec<EventId>,
    },
}

/// Event log persisted as JSON lines.
///
/// The file is only ever appended to. Reads are served from an index built
/// when the file is opened.
#[derive(Debug)]
pub struct JsonlEventLog {
    path: PathBuf,
    file: Mutex<File>,
    index: RwLock<EventIndex>,
}

impl JsonlEventLog {
    /// Open or create the log at `path`, loading existing records.
    pub async fn open(path: impl AsRef<Path>) -> EventLogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = EventIndex::default();

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let segments: Vec<&str> = content.split_inclusive('\n').collect();
        let last = segments.len().saturating_sub(1);
        let mut offset = 0;
        let mut torn_at = None;

        for (line_no, segment) in segments.iter().enumerate() {
            let start = offset;
            offset += segment.len();
            let line = segment.trim();
            if line.is_empty() {
                continue;
            }
            let record: LogRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                // An unterminated final line is a write that never finished.
                Err(e) if line_no == last && !segment.ends_with('\n') => {
                    warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        error = %e,
                        "Dropping torn record at end of event log"
                    );
                    torn_at = Some(start);
                    break;
                }
                Err(e) => {
                    return Err(EventLogError::Backend(format!(
                        "corrupted record at {}:{}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    )))
                }
            };
            match record {
                LogRecord::Event(event) => {
                    index.check_batch(std::slice::from_ref(&event))?;
                    index.insert_batch(vec![event]);
                }
                LogRecord::Batch(events) => {
                    index.check_batch(&events)?;
                    index.insert_batch(events);
                }
                LogRecord::Link { parent, children } => index.link(parent, &children)?,
            }
        }

        if let Some(len) = torn_at {
            let file = OpenOptions::new().write(true).open(&path).await?;
            file.set_len(len as u64).await?;
            file.sync_data().await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), events = index.len(), "Opened event log");

        Ok(Self {
            path,
            file: Mutex::new(file),
            index: RwLock::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
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

    /// Write one record and sync. A failed write is cut back off the file.
    async fn persist(file: &mut File, record: &LogRecord) -> EventLogResult<()> {
        let mut buffer = serde_json::to_vec(record)?;
        buffer.push(b'\n');

        let committed = file.metadata().await?.len();
        if let Err(e) = Self::write_synced(file, &buffer).await {
            if let Err(cut) = file.set_len(committed).await {
                warn!(error = %cut, "Could not cut back a failed event log write");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn write_synced(file: &mut File, buffer: &[u8]) -> EventLogResult<()> {
        file.write_all(buffer).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

#[async_trait]
impl EventLog for JsonlEventLog {
    async fn append(&self, event: CuriosityEvent) -> EventLogResult<()> {
        self.append_batch(vec![event]).await
    }

    async fn append_batch(&self, events: Vec<CuriosityEvent>) -> EventLogResult<()> {
        // Held across the write so file order matches index order.
        let mut file = self.file.lock().await;

        self.read(|index| index.check_batch(&events))??;

        let record = match events.as_slice() {
            [event] => LogRecord::Event(event.clone()),
            _ => LogRecord::Batch(events.clone()),
        };
        Self::persist(&mut file, &record).await?;

        let count = events.len();
        self.write(|index| {
            index.insert_batch(events);
            Ok(())
        })?;

        debug!(count, "Appended curiosity events to log file");
        Ok(())
    }

    async fn link_triggered_events(
        &self,
        parent: EventId,
        children: Vec<EventId>,
    ) -> EventLogResult<()> {
        let mut file = self.file.lock().await;

        self.read(|index| index.check_link(parent))??;

        let record = LogRecord::Link {
            parent,
            children: children.clone(),
        };
        Self::persist(&mut file, &record).await?;
        self.write(|index| index.link(parent, &children))?;

        debug!(parent = %parent, children = children.len(), "Linked cascade events in log file");
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
