use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use ripple_store::Store;
use ripple_types::{ChatSettings, ConversationKey, TemporaryDuration};

use crate::config::ChatConfig;

/// Deletes disappearing messages once they outlive their configured
/// time-to-live.
///
/// One sweep loop per open conversation, armed from the owner's chat
/// settings and stopped when the view closes. Deletes go straight through
/// the store (no sender permission check) and are idempotent, so racing a
/// read receipt or another client's sweep in either order is harmless.
///
/// The sweeper only runs while a conversation is open on some client: a
/// conversation nobody reopens keeps its overdue messages until someone
/// does. A server-side job would close that gap and is deliberately not
/// part of this core.
pub struct ExpirySweeper {
    store: Arc<Store>,
    self_id: Uuid,
    config: ChatConfig,
    active: Mutex<HashMap<ConversationKey, CancellationToken>>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<Store>, self_id: Uuid, config: ChatConfig) -> Self {
        Self {
            store,
            self_id,
            config,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Persist the time-to-live for this conversation in our settings.
    /// Takes effect on the next `start`.
    pub async fn configure(
        &self,
        conversation: ConversationKey,
        duration: TemporaryDuration,
    ) -> anyhow::Result<()> {
        let partner = conversation
            .peer_of(self.self_id)
            .ok_or_else(|| anyhow::anyhow!("not a participant of {conversation}"))?;

        let mut settings = self
            .store
            .settings(self.self_id, partner)?
            .unwrap_or_else(|| ChatSettings::new(self.self_id, partner));
        settings.temporary_messages = duration;
        self.store.upsert_settings(&settings)
    }

    /// Arm the sweep loop for an opened conversation. With the duration
    /// disabled (or no settings at all) nothing is spawned and nothing
    /// ever expires.
    pub async fn start(&self, conversation: ConversationKey) -> anyhow::Result<()> {
        self.stop(conversation).await;

        let partner = conversation
            .peer_of(self.self_id)
            .ok_or_else(|| anyhow::anyhow!("not a participant of {conversation}"))?;

        let duration = self
            .store
            .settings(self.self_id, partner)?
            .map(|s| s.temporary_messages)
            .unwrap_or(TemporaryDuration::Disabled);
        let Some(ttl) = duration.as_duration() else {
            info!("Disappearing messages off for {}", conversation);
            return Ok(());
        };
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| anyhow::anyhow!("time-to-live out of range: {e}"))?;

        let token = CancellationToken::new();
        let child = token.clone();
        let store = self.store.clone();
        let tick = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                tokio::select! {
                    // Stop wins over a due tick.
                    biased;
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        let cutoff = Utc::now() - ttl;
                        match store.delete_expired(conversation, cutoff) {
                            Ok(ids) if !ids.is_empty() => {
                                info!("Expired {} messages in {}", ids.len(), conversation);
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Expiry sweep failed: {}", e),
                        }
                    }
                }
            }
        });

        info!(
            "Disappearing messages armed for {} ({})",
            conversation,
            duration.as_str()
        );
        self.active.lock().await.insert(conversation, token);
        Ok(())
    }

    /// Disarm the sweep loop when the conversation view closes.
    pub async fn stop(&self, conversation: ConversationKey) {
        if let Some(token) = self.active.lock().await.remove(&conversation) {
            token.cancel();
        }
    }

    pub async fn stop_all(&self) {
        for (_, token) in self.active.lock().await.drain() {
            token.cancel();
        }
    }
}
