use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

use ripple_types::{ConversationKey, TypingEvent};

use crate::config::ChatConfig;

/// Debounced typing-state broadcast for the local user plus a
/// self-healing mirror of who is typing at us.
///
/// The stop side is where the design lives: the sender debounces the
/// `typing: false` broadcast behind an inactivity timer, and receivers
/// expire remote entries on their own after a grace period, so the
/// protocol survives exactly one lost stop event.
pub struct TypingCoordinator {
    inner: Arc<TypingInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

struct TypingInner {
    self_id: Uuid,
    transport: broadcast::Sender<TypingEvent>,
    /// Conversations we are currently typing into, with the armed
    /// stop timer for each.
    local: AsyncMutex<HashMap<ConversationKey, JoinHandle<()>>>,
    /// Remote typists per conversation, each entry carrying its own
    /// expiry deadline.
    remote: RwLock<HashMap<ConversationKey, HashMap<Uuid, Instant>>>,
    config: ChatConfig,
}

impl TypingCoordinator {
    pub fn new(
        self_id: Uuid,
        transport: broadcast::Sender<TypingEvent>,
        config: ChatConfig,
    ) -> Self {
        let inner = Arc::new(TypingInner {
            self_id,
            transport,
            local: AsyncMutex::new(HashMap::new()),
            remote: RwLock::new(HashMap::new()),
            config,
        });

        let listener = {
            let inner = inner.clone();
            let mut rx = inner.transport.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => observe(&inner, event).await,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            })
        };

        Self {
            inner,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Report local typing activity. Call with `true` on every keystroke;
    /// the broadcast fires on the idle→typing transition and each call
    /// re-arms the inactivity timer that fires the single stop broadcast.
    /// `false` (message sent, input cleared) stops immediately.
    pub async fn set_typing(&self, conversation: ConversationKey, typing: bool) {
        let mut local = self.inner.local.lock().await;

        if typing {
            let newly = !local.contains_key(&conversation);
            if let Some(timer) = local.remove(&conversation) {
                timer.abort();
            }
            if newly {
                trace!("Typing started in {}", conversation);
                let _ = self.inner.transport.send(TypingEvent {
                    conversation,
                    user_id: self.inner.self_id,
                    typing: true,
                });
            }

            let inner = self.inner.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(inner.config.typing_debounce).await;
                let mut local = inner.local.lock().await;
                if local.remove(&conversation).is_some() {
                    trace!("Typing timed out in {}", conversation);
                    let _ = inner.transport.send(TypingEvent {
                        conversation,
                        user_id: inner.self_id,
                        typing: false,
                    });
                }
            });
            local.insert(conversation, timer);
        } else if let Some(timer) = local.remove(&conversation) {
            timer.abort();
            trace!("Typing stopped in {}", conversation);
            let _ = self.inner.transport.send(TypingEvent {
                conversation,
                user_id: self.inner.self_id,
                typing: false,
            });
        }
    }

    /// Who is currently typing in this conversation. Entries past their
    /// grace deadline are purged here, whether or not a stop event ever
    /// arrived.
    pub async fn typing_users(&self, conversation: ConversationKey) -> Vec<Uuid> {
        let now = Instant::now();
        let mut remote = self.inner.remote.write().await;
        let Some(typists) = remote.get_mut(&conversation) else {
            return Vec::new();
        };
        typists.retain(|_, deadline| *deadline > now);
        let mut users: Vec<Uuid> = typists.keys().copied().collect();
        if typists.is_empty() {
            remote.remove(&conversation);
        }
        users.sort();
        users
    }

    /// Stop the transport listener and any armed stop timers.
    pub async fn shutdown(&self) {
        if let Some(listener) = self.listener_lock().take() {
            listener.abort();
        }
        let mut local = self.inner.local.lock().await;
        for (_, timer) in local.drain() {
            timer.abort();
        }
    }

    fn listener_lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.listener.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn observe(inner: &Arc<TypingInner>, event: TypingEvent) {
    if event.user_id == inner.self_id {
        return;
    }

    let mut remote = inner.remote.write().await;
    if event.typing {
        remote
            .entry(event.conversation)
            .or_default()
            .insert(event.user_id, Instant::now() + inner.config.typing_grace);
    } else if let Some(typists) = remote.get_mut(&event.conversation) {
        typists.remove(&event.user_id);
        if typists.is_empty() {
            remote.remove(&event.conversation);
        }
    }
}
