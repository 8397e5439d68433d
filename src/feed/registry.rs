//! Connection registry
//!
//! Tracks the authenticated streaming connections that receive broadcast
//! ticks. All membership changes and snapshots go through one mutex; the
//! snapshot is a copy so fan-out never holds the lock across network I/O.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::Result;

/// Unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A registered recipient of broadcast ticks
///
/// Implemented by the live WebSocket writer; tests plug in their own.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Stable identity used for registry membership
    fn id(&self) -> ConnectionId;

    /// Authenticated subject behind this connection
    fn subject(&self) -> &str;

    /// Deliver one serialized payload
    async fn send(&self, payload: &str) -> Result<()>;

    /// Called after the broadcaster drops this connection from the registry
    fn on_evicted(&self) {}
}

/// Process-wide set of live streaming connections
#[derive(Default)]
pub struct ConnectionRegistry {
    members: Mutex<HashMap<ConnectionId, Arc<dyn Subscriber>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Add a connection. Returns false if it was already registered.
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> bool {
        let mut members = self.members.lock();
        let id = subscriber.id();
        if members.contains_key(&id) {
            return false;
        }
        members.insert(id, subscriber);
        true
    }

    /// Remove a connection. Returns false if it was not registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        self.members.lock().remove(&id).is_some()
    }

    /// Point-in-time copy of the current members
    pub fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        self.members.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("members", &self.len())
            .finish()
    }
}
