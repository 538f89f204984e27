//! In-memory session store with bounded history and idle eviction.
//!
//! Holds every active conversation for the process. Sessions are created on
//! first use, capped to a fixed number of turns (oldest dropped first), and
//! removed by a periodic eviction sweep once idle beyond the TTL. Nothing is
//! persisted across restarts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Originator of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when serializing turns into a prompt.
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One message exchanged in a conversation, tagged with its originator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single conversation context, owned exclusively by the store.
#[derive(Debug, Clone)]
struct Session {
    turns: Vec<Turn>,
    last_active: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            turns: Vec::new(),
            last_active: now,
        }
    }
}

/// Process-wide mapping from session id to conversation history.
///
/// All mutating operations are serialized through one mutex; the lock is
/// never held across an await point. The eviction sweep takes the same
/// lock, so it cannot interleave with an in-progress append.
pub struct SessionStore {
    inner: Mutex<HashMap<String, Session>>,
    max_turns: usize,
}

impl SessionStore {
    /// Create an empty store capping each session at `max_turns`.
    pub fn new(max_turns: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_turns,
        }
    }

    /// Configured per-session turn cap.
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        // A poisoned lock only means a panic mid-mutation elsewhere; the
        // map itself is still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Resolve a session id, creating the session when needed.
    ///
    /// An existing id is touched and returned. An unknown client-supplied
    /// id (including one whose session was evicted) silently starts a fresh
    /// session under that id. With no id at all, a new unique id is
    /// generated.
    pub fn get_or_create(&self, id: Option<&str>) -> String {
        let now = Utc::now();
        let mut sessions = self.lock();

        match id {
            Some(id) if !id.is_empty() => {
                if let Some(session) = sessions.get_mut(id) {
                    session.last_active = now;
                } else {
                    tracing::debug!(session_id = %id, "Unknown session id supplied, starting fresh");
                    sessions.insert(id.to_string(), Session::new(now));
                }
                id.to_string()
            }
            _ => {
                let mut id = uuid::Uuid::new_v4().to_string();
                // v4 collisions are not a practical concern, but the store
                // guarantees uniqueness at any instant.
                while sessions.contains_key(&id) {
                    id = uuid::Uuid::new_v4().to_string();
                }
                sessions.insert(id.clone(), Session::new(now));
                id
            }
        }
    }

    /// Append a turn to a session, trimming the oldest turns beyond the cap.
    ///
    /// Returns `false` (a silent no-op) when the session no longer exists,
    /// e.g. it was evicted mid-request; the caller must re-create it.
    pub fn append_turn(&self, session_id: &str, turn: Turn) -> bool {
        let now = Utc::now();
        let mut sessions = self.lock();

        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };

        session.turns.push(turn);
        if session.turns.len() > self.max_turns {
            let excess = session.turns.len() - self.max_turns;
            session.turns.drain(..excess);
        }
        session.last_active = now;
        true
    }

    /// Snapshot of a session's turns in chronological order.
    ///
    /// Touches `last_active`, since a read on the chat path means the
    /// session is in use.
    pub fn turns(&self, session_id: &str) -> Option<Vec<Turn>> {
        let now = Utc::now();
        let mut sessions = self.lock();
        let session = sessions.get_mut(session_id)?;
        session.last_active = now;
        Some(session.turns.clone())
    }

    /// Number of turns currently stored for a session.
    pub fn turn_count(&self, session_id: &str) -> Option<usize> {
        self.lock().get(session_id).map(|s| s.turns.len())
    }

    /// Remove every session idle longer than `ttl`. Returns the eviction count.
    pub fn evict_idle(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_active <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, active = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether a session with the given id exists.
    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }
}
