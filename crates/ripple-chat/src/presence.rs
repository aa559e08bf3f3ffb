use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use ripple_types::{PresenceState, PresenceUpdate};

use crate::config::ChatConfig;

/// Local updates buffered per UI subscriber.
const UPDATE_BUFFER: usize = 256;

#[derive(Clone, Copy)]
struct PeerSeen {
    at: Instant,
    wall: DateTime<Utc>,
    online: bool,
}

/// Best-effort online/offline tracking over a shared presence channel.
///
/// The local client announces itself with periodic heartbeats; peers that
/// go quiet past the timeout are interpreted as offline. Advisory state
/// only; nothing else depends on it for correctness.
pub struct PresenceTracker {
    inner: Arc<PresenceInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct PresenceInner {
    self_id: Uuid,
    transport: broadcast::Sender<PresenceUpdate>,
    updates: broadcast::Sender<PresenceUpdate>,
    peers: RwLock<HashMap<Uuid, PeerSeen>>,
    config: ChatConfig,
}

impl PresenceTracker {
    /// `transport` is the shared realtime channel; every client of the
    /// app holds a clone of the same sender.
    pub fn new(
        self_id: Uuid,
        transport: broadcast::Sender<PresenceUpdate>,
        config: ChatConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        let inner = Arc::new(PresenceInner {
            self_id,
            transport,
            updates,
            peers: RwLock::new(HashMap::new()),
            config,
        });

        let listener = {
            let inner = inner.clone();
            let mut rx = inner.transport.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(update) => observe(&inner, update).await,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            })
        };

        let sweeper = {
            let inner = inner.clone();
            tokio::spawn(async move {
                // Check twice per timeout window so nobody lingers long.
                let mut interval = tokio::time::interval(inner.config.presence_timeout / 2);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    sweep(&inner).await;
                }
            })
        };

        Self {
            inner,
            tasks: Mutex::new(vec![listener, sweeper]),
        }
    }

    /// Announce ourselves once on the shared channel.
    pub fn announce(&self) {
        let _ = self.inner.transport.send(PresenceUpdate {
            user_id: self.inner.self_id,
            online: true,
            last_seen: Utc::now(),
        });
    }

    /// Spawn the periodic heartbeat announcing this client.
    pub fn start_heartbeat(&self) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.heartbeat_interval);
            loop {
                interval.tick().await;
                let _ = inner.transport.send(PresenceUpdate {
                    user_id: inner.self_id,
                    online: true,
                    last_seen: Utc::now(),
                });
            }
        });
        self.tasks_lock().push(handle);
    }

    /// Stream of presence transitions for the UI.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceUpdate> {
        self.inner.updates.subscribe()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.state_of(user_id).await.is_some_and(|s| s.online)
    }

    /// Last known state for a peer, if we have ever heard from them this
    /// session. Liveness is recomputed against the timeout on read, so a
    /// peer can be reported offline before the sweeper gets to them.
    pub async fn state_of(&self, user_id: Uuid) -> Option<PresenceState> {
        let peers = self.inner.peers.read().await;
        peers.get(&user_id).map(|seen| PresenceState {
            online: seen.online && seen.at.elapsed() < self.inner.config.presence_timeout,
            last_seen: seen.wall,
        })
    }

    /// Stop all background tasks. State is not persisted; presence is
    /// rebuilt from heartbeats on the next session.
    pub fn shutdown(&self) {
        for task in self.tasks_lock().drain(..) {
            task.abort();
        }
    }

    fn tasks_lock(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn observe(inner: &Arc<PresenceInner>, update: PresenceUpdate) {
    if update.user_id == inner.self_id {
        return;
    }

    let transition = {
        let mut peers = inner.peers.write().await;
        let previous = peers.get(&update.user_id).map(|seen| seen.online);
        peers.insert(
            update.user_id,
            PeerSeen {
                at: Instant::now(),
                wall: update.last_seen,
                online: update.online,
            },
        );
        previous != Some(update.online)
    };

    if transition {
        debug!(
            "Presence: {} is now {}",
            update.user_id,
            if update.online { "online" } else { "offline" }
        );
        let _ = inner.updates.send(update);
    }
}

async fn sweep(inner: &Arc<PresenceInner>) {
    let timed_out: Vec<PresenceUpdate> = {
        let mut peers = inner.peers.write().await;
        let mut quiet = Vec::new();
        for (user_id, seen) in peers.iter_mut() {
            if seen.online && seen.at.elapsed() >= inner.config.presence_timeout {
                seen.online = false;
                quiet.push(PresenceUpdate {
                    user_id: *user_id,
                    online: false,
                    last_seen: seen.wall,
                });
            }
        }
        quiet
    };

    for update in timed_out {
        debug!("Presence: {} timed out", update.user_id);
        let _ = inner.updates.send(update);
    }
}
