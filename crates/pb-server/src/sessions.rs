use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use pb_core::eval::SessionState;

// ---------------------------------------------------------------------------
// SessionEntry — one live session plus its expiry bookkeeping
// ---------------------------------------------------------------------------

pub struct SessionEntry {
    pub state: SessionState,
    last_touched: Instant,
}

impl SessionEntry {
    pub fn new(state: SessionState) -> Self {
        Self {
            state,
            last_touched: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_touched.elapsed()
    }
}

/// Shared session map used by the handlers and the sweeper.
pub type SharedSessions = Arc<RwLock<HashMap<Uuid, SessionEntry>>>;

// ---------------------------------------------------------------------------
// SessionMap — owner of the shared map and its background sweep
// ---------------------------------------------------------------------------

pub struct SessionMap {
    sessions: SharedSessions,
}

impl SessionMap {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn shared(&self) -> SharedSessions {
        Arc::clone(&self.sessions)
    }

    /// Evicts sessions idle for longer than `ttl` on a fixed interval.
    /// Abandoned and submitted sessions alike age out here; there is no
    /// explicit delete endpoint.
    pub fn start_background_sweep(&self, ttl: Duration, interval: Duration) -> JoinHandle<()> {
        let sessions = self.shared();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                let mut map = sessions.write().await;
                let evicted = sweep_expired(&mut map, ttl);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = map.len(), "swept expired sessions");
                }
            }
        })
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn sweep_expired(map: &mut HashMap<Uuid, SessionEntry>, ttl: Duration) -> usize {
    let before = map.len();
    map.retain(|_, entry| entry.idle_for() < ttl);
    before - map.len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
