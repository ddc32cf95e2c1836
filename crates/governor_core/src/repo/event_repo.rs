//! Event repository contract and JSON snapshot implementation.
//!
//! # Responsibility
//! - Own the authoritative in-memory event set and its ID counter.
//! - Mirror every mutation to a JSON file as a whole-snapshot rewrite.
//!
//! # Invariants
//! - IDs are `ev<N>` with `N` strictly increasing; the counter never moves
//!   backwards, deletions and restarts included.
//! - The counter is persisted in a `<file>.seq` sidecar before the event file
//!   is replaced, so the sidecar is never behind an issued ID.
//! - A failed persist after `add` restores the pre-call map and the ID is
//!   never handed out.
//! - A failed persist after `delete` is logged only; the removal stands.
//! - Snapshot writes are serialized, so the file always holds the latest
//!   committed state.

use crate::model::event::{event_id_number, format_event_id, Event, NewEvent};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tempfile::NamedTempFile;

pub type RepoResult<T> = Result<T, RepoError>;

const COUNTER_FILE_SUFFIX: &str = ".seq";

/// Repository error for event persistence and loading.
#[derive(Debug)]
pub enum RepoError {
    Io { path: PathBuf, source: std::io::Error },
    Serialize(serde_json::Error),
    /// A backing file exists but does not hold valid repository data.
    Corrupt { path: PathBuf, source: serde_json::Error },
    /// Every counter value has been issued.
    IdsExhausted,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Serialize(err) => write!(f, "serialize events: {err}"),
            Self::Corrupt { path, source } => {
                write!(f, "malformed repository file `{}`: {source}", path.display())
            }
            Self::IdsExhausted => write!(f, "event id counter exhausted"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Corrupt { source, .. } => Some(source),
            Self::IdsExhausted => None,
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Repository interface for event storage.
///
/// Implementations must be safe to share across concurrently dispatched
/// requests.
pub trait EventRepository: Send + Sync {
    /// Stores `event` under a fresh ID and returns that ID.
    fn add(&self, event: NewEvent) -> RepoResult<String>;
    fn get(&self, id: &str) -> Option<Event>;
    /// Returns a copy of every event; order is unspecified.
    fn list(&self) -> Vec<Event>;
    /// Removes `id`; returns `false` when no such event exists.
    fn delete(&self, id: &str) -> bool;
}

/// On-disk form of the ID counter sidecar.
#[derive(Debug, Serialize, Deserialize)]
struct CounterRecord {
    #[serde(rename = "NextId")]
    next_id: u64,
}

#[derive(Debug, Default)]
struct EventIndex {
    by_id: HashMap<String, Event>,
    /// Counter value for the next generated ID.
    next_id: u64,
}

impl EventIndex {
    fn from_events(events: Vec<Event>) -> Self {
        let mut next_id = 1;
        let mut by_id = HashMap::with_capacity(events.len());
        for event in events {
            next_id = next_id.max(event_id_number(&event.id).saturating_add(1));
            by_id.insert(event.id.clone(), event);
        }
        Self { by_id, next_id }
    }

    fn snapshot(&self) -> Vec<Event> {
        self.by_id.values().cloned().collect()
    }
}

/// Event repository backed by a JSON array file.
///
/// Without a path (`in_memory`) it behaves identically but never touches disk.
pub struct JsonEventRepository {
    path: Option<PathBuf>,
    index: RwLock<EventIndex>,
    /// Serializes snapshot writes; held across the file write only.
    persist_lock: Mutex<()>,
}

impl JsonEventRepository {
    /// Opens the repository at `path`, loading any existing events.
    ///
    /// # Errors
    /// - Returns `Io` when the file exists but cannot be read.
    /// - Returns `Corrupt` when the file content is not a valid event list.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let repo = Self {
            path: Some(path.as_ref().to_path_buf()),
            index: RwLock::new(EventIndex::from_events(Vec::new())),
            persist_lock: Mutex::new(()),
        };
        repo.load()?;
        Ok(repo)
    }

    /// Creates an empty repository that keeps events in memory only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            index: RwLock::new(EventIndex::from_events(Vec::new())),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the in-memory set with the backing file content.
    ///
    /// A missing file yields an empty repository. The counter resumes at the
    /// larger of the sidecar value and one past the highest loaded ID.
    pub fn load(&self) -> RepoResult<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let started_at = Instant::now();

        let events = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<Vec<Event>>(&bytes).map_err(|source| {
                error!(
                    "event=events_load module=repo status=error path={} error_code=corrupt error={}",
                    path.display(),
                    source
                );
                RepoError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                error!(
                    "event=events_load module=repo status=error path={} error_code=read_failed error={}",
                    path.display(),
                    source
                );
                return Err(RepoError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let persisted_next_id = read_counter(&counter_path(path))?;
        let loaded = EventIndex::from_events(events);
        let mut index = self.write_index();
        // Never move the counter backwards when reloading over a live set.
        let next_id = loaded
            .next_id
            .max(persisted_next_id.unwrap_or_default())
            .max(index.next_id);
        *index = EventIndex { next_id, ..loaded };
        info!(
            "event=events_load module=repo status=ok path={} count={} next_id={} duration_ms={}",
            path.display(),
            index.by_id.len(),
            index.next_id,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Counter value the next `add` will use.
    pub fn next_id(&self) -> u64 {
        self.read_index().next_id
    }

    pub fn len(&self) -> usize {
        self.read_index().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().by_id.is_empty()
    }

    fn read_index(&self) -> RwLockReadGuard<'_, EventIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, EventIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_persist(&self) -> MutexGuard<'_, ()> {
        self.persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, snapshot: &[Event], next_id: u64) -> RepoResult<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let counter = serde_json::to_vec(&CounterRecord { next_id })?;
        write_atomic(&counter_path(path), &counter)?;
        write_atomic(path, &serde_json::to_vec_pretty(snapshot)?)?;
        debug!(
            "event=events_save module=repo status=ok path={} count={} next_id={}",
            path.display(),
            snapshot.len(),
            next_id
        );
        Ok(())
    }
}

impl EventRepository for JsonEventRepository {
    fn add(&self, event: NewEvent) -> RepoResult<String> {
        let _persist = self.lock_persist();

        let (id, next_id, snapshot) = {
            let mut index = self.write_index();
            let Some(next_id) = index.next_id.checked_add(1) else {
                error!("event=event_add module=repo status=error error_code=ids_exhausted");
                return Err(RepoError::IdsExhausted);
            };
            let id = format_event_id(index.next_id);
            index.next_id = next_id;
            index
                .by_id
                .insert(id.clone(), event.into_event(id.clone()));
            (id, next_id, index.snapshot())
        };

        if let Err(err) = self.save(&snapshot, next_id) {
            error!(
                "event=event_add module=repo status=error id={} error_code=persist_failed error={}",
                id, err
            );
            self.write_index().by_id.remove(&id);
            return Err(err);
        }

        Ok(id)
    }

    fn get(&self, id: &str) -> Option<Event> {
        self.read_index().by_id.get(id).cloned()
    }

    fn list(&self) -> Vec<Event> {
        self.read_index().snapshot()
    }

    fn delete(&self, id: &str) -> bool {
        let _persist = self.lock_persist();

        let (snapshot, next_id) = {
            let mut index = self.write_index();
            if index.by_id.remove(id).is_none() {
                return false;
            }
            (index.snapshot(), index.next_id)
        };

        if let Err(err) = self.save(&snapshot, next_id) {
            // The removal is kept; disk catches up on the next successful write.
            error!(
                "event=event_delete module=repo status=error id={} error_code=persist_failed error={}",
                id, err
            );
        }
        true
    }
}

/// Sidecar holding the ID counter for the event file at `path`.
fn counter_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(COUNTER_FILE_SUFFIX);
    PathBuf::from(name)
}

/// Reads the persisted counter; `None` when no sidecar exists yet.
fn read_counter(path: &Path) -> RepoResult<Option<u64>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(RepoError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let record: CounterRecord = serde_json::from_slice(&bytes).map_err(|source| {
        error!(
            "event=counter_load module=repo status=error path={} error_code=corrupt error={}",
            path.display(),
            source
        );
        RepoError::Corrupt {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(record.next_id))
}

/// Replaces `path` with `data` via a synced temp file in the same directory.
fn write_atomic(path: &Path, data: &[u8]) -> RepoResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source: std::io::Error| RepoError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(data).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
