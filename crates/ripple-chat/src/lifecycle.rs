use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ripple_store::Store;
use ripple_types::{ChangeEvent, ConversationKey, Draft, Message, MessageKind};

use crate::error::{DeleteError, EditError, MarkReadError, SendError};
use crate::notify::{AppVisibility, Notifier};

/// Client-side delivery state of one message.
///
/// `Pending` is the optimistic entry before the store confirms; it either
/// becomes `Delivered` (canonical row swapped in by identity) or is rolled
/// back out of the list on failure. Read state lives on the message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Delivered,
}

#[derive(Debug, Clone)]
pub struct LocalMessage {
    pub message: Message,
    pub delivery: Delivery,
}

struct OpenConversation {
    key: ConversationKey,
    messages: Vec<LocalMessage>,
    apply_task: Option<JoinHandle<()>>,
}

/// In-flight send attempts. An identical draft (same conversation, same
/// content, same media) is suppressed while the first attempt is running.
type AttemptKey = (ConversationKey, String, Option<String>);

struct AttemptGuard {
    attempts: Arc<Mutex<HashSet<AttemptKey>>>,
    key: AttemptKey,
}

impl AttemptGuard {
    /// Claims the key, or `None` if an identical send is already running.
    fn acquire(attempts: &Arc<Mutex<HashSet<AttemptKey>>>, key: AttemptKey) -> Option<Self> {
        let mut set = match attempts.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !set.insert(key.clone()) {
            return None;
        }
        Some(Self {
            attempts: attempts.clone(),
            key,
        })
    }
}

impl Drop for AttemptGuard {
    // Released on every exit path, success or failure.
    fn drop(&mut self) {
        let mut set = match self.attempts.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.remove(&self.key);
    }
}

/// Owns the message lifecycle for the conversation the user has open:
/// optimistic sends, the change-stream mirror, read receipts, edits and
/// deletes.
#[derive(Clone)]
pub struct ChatManager {
    inner: Arc<ChatInner>,
}

struct ChatInner {
    store: Arc<Store>,
    self_id: Uuid,
    notifier: Arc<dyn Notifier>,
    visibility: Arc<AppVisibility>,
    open: RwLock<Option<OpenConversation>>,
    attempts: Arc<Mutex<HashSet<AttemptKey>>>,
}

impl ChatManager {
    pub fn new(
        store: Arc<Store>,
        self_id: Uuid,
        notifier: Arc<dyn Notifier>,
        visibility: Arc<AppVisibility>,
    ) -> Self {
        Self {
            inner: Arc::new(ChatInner {
                store,
                self_id,
                notifier,
                visibility,
                open: RwLock::new(None),
                attempts: Arc::new(Mutex::new(HashSet::new())),
            }),
        }
    }

    pub fn self_id(&self) -> Uuid {
        self.inner.self_id
    }

    /// Open a conversation: load its history, mirror the change stream
    /// into local state. Any previously open conversation is closed first.
    pub async fn open(&self, conversation: ConversationKey) -> anyhow::Result<()> {
        self.close().await;

        // Subscribe before loading so nothing slips between the snapshot
        // and the stream; the apply task deduplicates by id.
        let mut changes = self.inner.store.subscribe();

        let store = self.inner.store.clone();
        let history = tokio::task::spawn_blocking(move || store.messages_for(conversation))
            .await
            .map_err(|e| anyhow::anyhow!("history load task failed: {e}"))??;

        let messages = history
            .into_iter()
            .map(|message| LocalMessage {
                message,
                delivery: Delivery::Delivered,
            })
            .collect();

        {
            let mut open = self.inner.open.write().await;
            *open = Some(OpenConversation {
                key: conversation,
                messages,
                apply_task: None,
            });
        }

        let inner = self.inner.clone();
        let apply_task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) => apply_change(&inner, event).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Change stream lagged by {} events", n);
                        continue;
                    }
                    Err(_) => break,
                }
            }
        });

        let mut open = self.inner.open.write().await;
        if let Some(state) = open.as_mut() {
            state.apply_task = Some(apply_task);
        } else {
            apply_task.abort();
        }

        info!("Opened conversation {}", conversation);
        Ok(())
    }

    /// Drop local state and unsubscribe from the change stream, so no
    /// stale handler outlives the conversation view.
    pub async fn close(&self) {
        let mut open = self.inner.open.write().await;
        if let Some(state) = open.take() {
            if let Some(task) = state.apply_task {
                task.abort();
            }
            debug!("Closed conversation {}", state.key);
        }
    }

    pub async fn open_conversation(&self) -> Option<ConversationKey> {
        self.inner.open.read().await.as_ref().map(|state| state.key)
    }

    /// Snapshot of local state for the view composer.
    pub async fn messages(&self) -> Vec<LocalMessage> {
        self.inner
            .open
            .read()
            .await
            .as_ref()
            .map(|state| state.messages.clone())
            .unwrap_or_default()
    }

    /// Send a draft into a conversation.
    ///
    /// The message appears locally at once (pending) and is swapped for
    /// the canonical row when the store confirms; on failure the
    /// optimistic entry is removed and the error surfaced.
    pub async fn send(
        &self,
        conversation: ConversationKey,
        draft: Draft,
    ) -> Result<Message, SendError> {
        if draft.is_empty() {
            return Err(SendError::EmptyDraft);
        }
        if draft.kind != MessageKind::Text && draft.media_url.is_none() {
            return Err(SendError::MissingMedia);
        }
        let receiver_id = conversation
            .peer_of(self.inner.self_id)
            .ok_or(SendError::NotParticipant)?;

        let key = (
            conversation,
            draft.content.clone(),
            draft.media_url.clone(),
        );
        let Some(_guard) = AttemptGuard::acquire(&self.inner.attempts, key) else {
            debug!("Suppressed duplicate send into {}", conversation);
            return Err(SendError::DuplicateInFlight);
        };

        let temp_id = Uuid::new_v4();
        let optimistic = Message {
            id: temp_id,
            conversation,
            sender_id: self.inner.self_id,
            receiver_id,
            content: draft.content.clone(),
            kind: draft.kind,
            media_url: draft.media_url.clone(),
            duration_seconds: draft.duration_seconds,
            created_at: Utc::now(),
            read_at: None,
            edited: false,
        };

        {
            let mut open = self.inner.open.write().await;
            if let Some(state) = open.as_mut() {
                if state.key == conversation {
                    state.messages.push(LocalMessage {
                        message: optimistic,
                        delivery: Delivery::Pending,
                    });
                }
            }
        }

        let store = self.inner.store.clone();
        let sender_id = self.inner.self_id;
        let to_insert = draft.clone();
        let result = tokio::task::spawn_blocking(move || {
            store.insert_message(sender_id, receiver_id, &to_insert)
        })
        .await;

        match result {
            Ok(Ok(confirmed)) => {
                let mut open = self.inner.open.write().await;
                if let Some(state) = open.as_mut() {
                    if let Some(entry) = state
                        .messages
                        .iter_mut()
                        .find(|entry| entry.message.id == temp_id)
                    {
                        // Replace by identity, never patch the pending row
                        // in place, the canonical one wins wholesale.
                        *entry = LocalMessage {
                            message: confirmed.clone(),
                            delivery: Delivery::Delivered,
                        };
                    }
                }
                Ok(confirmed)
            }
            Ok(Err(e)) => {
                self.roll_back(temp_id).await;
                warn!("Send into {} failed: {}", conversation, e);
                Err(SendError::Store(e))
            }
            Err(join) => {
                self.roll_back(temp_id).await;
                Err(SendError::Store(anyhow::anyhow!(
                    "send task failed: {join}"
                )))
            }
        }
    }

    async fn roll_back(&self, temp_id: Uuid) {
        let mut open = self.inner.open.write().await;
        if let Some(state) = open.as_mut() {
            state.messages.retain(|entry| entry.message.id != temp_id);
        }
    }

    /// Mark every unread message addressed to us in this conversation as
    /// read. Idempotent; returns how many receipts were written.
    pub async fn mark_read(
        &self,
        conversation: ConversationKey,
    ) -> Result<usize, MarkReadError> {
        let store = self.inner.store.clone();
        let reader = self.inner.self_id;
        let updated = tokio::task::spawn_blocking(move || {
            store.mark_conversation_read(conversation, reader)
        })
        .await
        .map_err(|e| MarkReadError::Store(anyhow::anyhow!("mark-read task failed: {e}")))?
        .map_err(MarkReadError::Store)?;

        let mut open = self.inner.open.write().await;
        if let Some(state) = open.as_mut() {
            for message in &updated {
                replace_by_id(&mut state.messages, message);
            }
        }
        Ok(updated.len())
    }

    /// Edit a text message we sent. Flags the row as edited.
    pub async fn edit(&self, id: Uuid, new_content: &str) -> Result<(), EditError> {
        if new_content.trim().is_empty() {
            return Err(EditError::EmptyContent);
        }
        {
            let open = self.inner.open.read().await;
            let entry = open
                .as_ref()
                .and_then(|state| state.messages.iter().find(|entry| entry.message.id == id))
                .ok_or(EditError::UnknownMessage)?;
            if entry.message.sender_id != self.inner.self_id {
                return Err(EditError::NotSender);
            }
            if entry.message.kind != MessageKind::Text {
                return Err(EditError::NotText);
            }
        }

        let store = self.inner.store.clone();
        let content = new_content.to_string();
        let updated = tokio::task::spawn_blocking(move || store.set_content(id, &content))
            .await
            .map_err(|e| EditError::Store(anyhow::anyhow!("edit task failed: {e}")))?
            .map_err(EditError::Store)?;

        let mut open = self.inner.open.write().await;
        if let Some(state) = open.as_mut() {
            replace_by_id(&mut state.messages, &updated);
        }
        Ok(())
    }

    /// Hard-delete a message we sent. The expiry sweeper bypasses this
    /// permission check by deleting through the store directly.
    pub async fn delete(&self, id: Uuid) -> Result<(), DeleteError> {
        {
            let open = self.inner.open.read().await;
            let entry = open
                .as_ref()
                .and_then(|state| state.messages.iter().find(|entry| entry.message.id == id))
                .ok_or(DeleteError::UnknownMessage)?;
            if entry.message.sender_id != self.inner.self_id {
                return Err(DeleteError::NotSender);
            }
        }

        let store = self.inner.store.clone();
        tokio::task::spawn_blocking(move || store.delete_message(id))
            .await
            .map_err(|e| DeleteError::Store(anyhow::anyhow!("delete task failed: {e}")))?
            .map_err(DeleteError::Store)?;

        let mut open = self.inner.open.write().await;
        if let Some(state) = open.as_mut() {
            state.messages.retain(|entry| entry.message.id != id);
        }
        Ok(())
    }
}

/// Mirror one change-stream event into local state.
async fn apply_change(inner: &Arc<ChatInner>, event: ChangeEvent) {
    let mut open = inner.open.write().await;
    let Some(state) = open.as_mut() else { return };
    if event.conversation() != state.key {
        return;
    }

    match event {
        ChangeEvent::Inserted { message } => {
            if state.messages.iter().any(|entry| entry.message.id == message.id) {
                return;
            }
            // Our own insert still pending: send() swaps it by identity,
            // the stream must not add a second copy.
            let own_pending = message.sender_id == inner.self_id
                && state.messages.iter().any(|entry| {
                    entry.delivery == Delivery::Pending
                        && entry.message.content == message.content
                        && entry.message.media_url == message.media_url
                });
            if own_pending {
                return;
            }

            let from_peer = message.sender_id != inner.self_id;
            let preview = preview_of(&message);
            state.messages.push(LocalMessage {
                message,
                delivery: Delivery::Delivered,
            });
            drop(open);

            if from_peer && inner.visibility.is_backgrounded() {
                inner.notifier.show("New message", &preview, None);
            }
        }
        ChangeEvent::Updated { message } => {
            replace_by_id(&mut state.messages, &message);
        }
        ChangeEvent::Deleted { id, .. } => {
            state.messages.retain(|entry| entry.message.id != id);
        }
    }
}

fn replace_by_id(messages: &mut [LocalMessage], updated: &Message) {
    if let Some(entry) = messages
        .iter_mut()
        .find(|entry| entry.message.id == updated.id)
    {
        entry.message = updated.clone();
        entry.delivery = Delivery::Delivered;
    }
}

fn preview_of(message: &Message) -> String {
    match message.kind {
        MessageKind::Text => {
            let mut preview: String = message.content.chars().take(80).collect();
            if message.content.chars().count() > 80 {
                preview.push('…');
            }
            preview
        }
        MessageKind::Image => "Photo".to_string(),
        MessageKind::Video => "Video".to_string(),
        MessageKind::Audio => "Voice message".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoopNotifier;
    use std::sync::Mutex as StdMutex;

    struct RecordingNotifier {
        shown: StdMutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                shown: StdMutex::new(Vec::new()),
            }
        }

        fn count(&self) -> usize {
            self.shown.lock().unwrap().len()
        }
    }

    impl Notifier for RecordingNotifier {
        fn show(&self, title: &str, body: &str, _icon: Option<&str>) {
            self.shown
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    fn manager_with(
        store: Arc<Store>,
        self_id: Uuid,
        notifier: Arc<dyn Notifier>,
        visibility: Arc<AppVisibility>,
    ) -> ChatManager {
        ChatManager::new(store, self_id, notifier, visibility)
    }

    /// Let spawned apply tasks drain the change stream.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn plain_manager(store: Arc<Store>, self_id: Uuid) -> ChatManager {
        manager_with(
            store,
            self_id,
            Arc::new(NoopNotifier),
            Arc::new(AppVisibility::foreground()),
        )
    }

    #[tokio::test]
    async fn empty_draft_is_rejected_before_any_insert() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);
        let manager = plain_manager(store.clone(), a);
        manager.open(key).await.unwrap();

        let err = manager.send(key, Draft::text("   ")).await.unwrap_err();
        assert!(matches!(err, SendError::EmptyDraft));
        assert!(store.messages_for(key).unwrap().is_empty());
        assert!(manager.messages().await.is_empty());
    }

    #[tokio::test]
    async fn non_text_draft_without_media_is_rejected() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);
        let manager = plain_manager(store, a);

        let draft = Draft {
            content: "caption only".into(),
            kind: MessageKind::Image,
            media_url: None,
            duration_seconds: None,
        };
        let err = manager.send(key, draft).await.unwrap_err();
        assert!(matches!(err, SendError::MissingMedia));
    }

    #[tokio::test]
    async fn duplicate_send_in_the_same_tick_inserts_once() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);
        let manager = plain_manager(store.clone(), a);
        manager.open(key).await.unwrap();

        let (first, second) = tokio::join!(
            manager.send(key, Draft::text("hi")),
            manager.send(key, Draft::text("hi")),
        );

        let outcomes = [first, second];
        assert_eq!(
            outcomes.iter().filter(|r| r.is_ok()).count(),
            1,
            "exactly one attempt lands"
        );
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(SendError::DuplicateInFlight))));
        assert_eq!(store.messages_for(key).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn send_after_completion_is_not_suppressed() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);
        let manager = plain_manager(store.clone(), a);

        manager.send(key, Draft::text("again")).await.unwrap();
        manager.send(key, Draft::text("again")).await.unwrap();
        assert_eq!(store.messages_for(key).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_send_rolls_back_the_optimistic_entry() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);
        let manager = plain_manager(store.clone(), a);
        manager.open(key).await.unwrap();

        store.close();
        let err = manager.send(key, Draft::text("lost")).await.unwrap_err();
        assert!(matches!(err, SendError::Store(_)));
        assert!(manager.messages().await.is_empty(), "rolled back");
    }

    #[tokio::test]
    async fn sender_outside_the_pair_is_rejected() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let key = ConversationKey::new(Uuid::new_v4(), Uuid::new_v4());
        let manager = plain_manager(store, Uuid::new_v4());

        let err = manager.send(key, Draft::text("hi")).await.unwrap_err();
        assert!(matches!(err, SendError::NotParticipant));
    }

    #[tokio::test]
    async fn peer_insert_reaches_local_state_and_notifies_when_backgrounded() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);

        let notifier = Arc::new(RecordingNotifier::new());
        let visibility = Arc::new(AppVisibility::foreground());
        visibility.set_foreground(false);
        let manager = manager_with(store.clone(), b, notifier.clone(), visibility);
        manager.open(key).await.unwrap();

        // Peer writes directly through the store, as another client would.
        store.insert_message(a, b, &Draft::text("knock knock")).unwrap();
        settle().await;

        let messages = manager.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message.content, "knock knock");
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn own_insert_does_not_notify() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);

        let notifier = Arc::new(RecordingNotifier::new());
        let visibility = Arc::new(AppVisibility::foreground());
        visibility.set_foreground(false);
        let manager = manager_with(store.clone(), a, notifier.clone(), visibility);
        manager.open(key).await.unwrap();

        manager.send(key, Draft::text("me")).await.unwrap();
        settle().await;

        assert_eq!(manager.messages().await.len(), 1, "no double entry");
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn foreground_insert_does_not_notify() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);

        let notifier = Arc::new(RecordingNotifier::new());
        let manager = manager_with(
            store.clone(),
            b,
            notifier.clone(),
            Arc::new(AppVisibility::foreground()),
        );
        manager.open(key).await.unwrap();

        store.insert_message(a, b, &Draft::text("seen live")).unwrap();
        settle().await;

        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn events_for_other_conversations_are_dropped() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);
        let manager = plain_manager(store.clone(), a);
        manager.open(key).await.unwrap();

        store.insert_message(b, c, &Draft::text("elsewhere")).unwrap();
        settle().await;

        assert!(manager.messages().await.is_empty());
    }

    #[tokio::test]
    async fn edit_is_sender_and_text_only() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);

        let alice = plain_manager(store.clone(), a);
        let bob = plain_manager(store.clone(), b);
        alice.open(key).await.unwrap();
        bob.open(key).await.unwrap();

        let sent = alice.send(key, Draft::text("typo")).await.unwrap();
        let voice = alice
            .send(key, Draft::audio("https://cdn/v.wav", 2.0))
            .await
            .unwrap();
        settle().await;

        assert!(matches!(
            bob.edit(sent.id, "not mine").await.unwrap_err(),
            EditError::NotSender
        ));
        assert!(matches!(
            alice.edit(voice.id, "voice").await.unwrap_err(),
            EditError::NotText
        ));
        assert!(matches!(
            alice.edit(sent.id, "  ").await.unwrap_err(),
            EditError::EmptyContent
        ));

        alice.edit(sent.id, "fixed").await.unwrap();
        let row = store
            .messages_for(key)
            .unwrap()
            .into_iter()
            .find(|m| m.id == sent.id)
            .unwrap();
        assert_eq!(row.content, "fixed");
        assert!(row.edited);
    }

    #[tokio::test]
    async fn delete_is_sender_only_and_propagates() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);

        let alice = plain_manager(store.clone(), a);
        let bob = plain_manager(store.clone(), b);
        alice.open(key).await.unwrap();
        bob.open(key).await.unwrap();

        let sent = alice.send(key, Draft::text("oops")).await.unwrap();
        settle().await;

        assert!(matches!(
            bob.delete(sent.id).await.unwrap_err(),
            DeleteError::NotSender
        ));

        alice.delete(sent.id).await.unwrap();
        settle().await;

        assert!(store.messages_for(key).unwrap().is_empty());
        assert!(alice.messages().await.is_empty());
        assert!(bob.messages().await.is_empty());
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_scoped_to_receiver() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b);

        let alice = plain_manager(store.clone(), a);
        let bob = plain_manager(store.clone(), b);
        alice.open(key).await.unwrap();
        bob.open(key).await.unwrap();

        alice.send(key, Draft::text("one")).await.unwrap();
        alice.send(key, Draft::text("two")).await.unwrap();
        bob.send(key, Draft::text("reply")).await.unwrap();
        settle().await;

        assert_eq!(bob.mark_read(key).await.unwrap(), 2);
        assert_eq!(bob.mark_read(key).await.unwrap(), 0);

        let rows = store.messages_for(key).unwrap();
        for row in rows {
            if row.receiver_id == b {
                assert!(row.is_read());
            } else {
                assert!(!row.is_read(), "alice has not read the reply");
            }
        }
    }

    #[tokio::test]
    async fn reopening_switches_conversations_cleanly() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let with_b = ConversationKey::new(a, b);
        let with_c = ConversationKey::new(a, c);

        let manager = plain_manager(store.clone(), a);
        manager.open(with_b).await.unwrap();
        manager.send(with_b, Draft::text("to b")).await.unwrap();

        manager.open(with_c).await.unwrap();
        assert_eq!(manager.open_conversation().await, Some(with_c));
        assert!(manager.messages().await.is_empty());

        // Traffic for the closed conversation no longer lands locally.
        store.insert_message(b, a, &Draft::text("late")).unwrap();
        settle().await;
        assert!(manager.messages().await.is_empty());
    }
}
