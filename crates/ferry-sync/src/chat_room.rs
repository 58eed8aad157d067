//! One open conversation.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ferry_client::ApiClient;
use ferry_core::Message;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::SyncError;
use crate::flight::SingleFlight;
use crate::optimistic::{MutationOutcome, apply_optimistic};
use crate::poller::{FetchMode, PollTarget};

/// Controller for a chat room with one contact.
pub struct ChatRoom {
    client: ApiClient,
    contact_id: i64,
    messages: Mutex<Vec<Message>>,
    me: Mutex<Option<i64>>,
    draft: Mutex<String>,
    loading: AtomicBool,
    send_flight: SingleFlight,
}

impl std::fmt::Debug for ChatRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRoom")
            .field("contact_id", &self.contact_id)
            .field("messages", &self.messages.lock().len())
            .finish_non_exhaustive()
    }
}

impl ChatRoom {
    /// Empty room for `contact_id`.
    pub fn new(client: ApiClient, contact_id: i64) -> Self {
        Self {
            client,
            contact_id,
            messages: Mutex::new(Vec::new()),
            me: Mutex::new(None),
            draft: Mutex::new(String::new()),
            loading: AtomicBool::new(false),
            send_flight: SingleFlight::new(),
        }
    }

    /// The other participant.
    pub fn contact_id(&self) -> i64 {
        self.contact_id
    }

    /// Messages, ascending by `created_at`.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Signed-in user id, once known.
    pub fn me(&self) -> Option<i64> {
        *self.me.lock()
    }

    /// Whether a visible fetch is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Resolve the signed-in user. A failure leaves the id unknown, so no
    /// message renders as outgoing.
    pub async fn load_me(&self) {
        let me = match self.client.me().await {
            Ok(user) => Some(user.id),
            Err(e) => {
                warn!(error = %e, "could not resolve signed-in user");
                None
            }
        };
        *self.me.lock() = me;
    }

    /// Whether `message` was sent by the signed-in user.
    pub fn is_mine(&self, message: &Message) -> bool {
        self.me() == Some(message.sender_id)
    }

    /// Replace the composer text.
    pub fn set_draft(&self, text: impl Into<String>) {
        *self.draft.lock() = text.into();
    }

    /// Composer text.
    pub fn draft(&self) -> String {
        self.draft.lock().clone()
    }

    /// Reload the conversation.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let messages = self.client.conversation(self.contact_id).await?;
        *self.messages.lock() = messages;
        Ok(())
    }

    /// Send the draft. The composer clears immediately and gets its text
    /// back if the send fails.
    pub async fn send(&self) -> Result<MutationOutcome<()>, SyncError> {
        let text = self.draft.lock().trim().to_string();
        if text.is_empty() {
            return Err(SyncError::precondition("Message is empty"));
        }
        apply_optimistic(
            &self.draft,
            &self.send_flight,
            String::clear,
            || self.client.send_message(self.contact_id, &text),
            || async {
                if let Err(e) = self.refresh().await {
                    debug!(error = %e, "conversation refresh after send failed");
                }
            },
        )
        .await
    }
}

#[async_trait]
impl PollTarget for ChatRoom {
    type Item = Vec<Message>;

    async fn fetch(&self, mode: FetchMode) -> Result<Vec<Message>, SyncError> {
        let visible = mode == FetchMode::Visible;
        if visible {
            self.loading.store(true, Ordering::Release);
        }
        let result = self
            .client
            .conversation(self.contact_id)
            .await
            .map_err(SyncError::from);
        if visible {
            self.loading.store(false, Ordering::Release);
        }
        result
    }

    fn apply(&self, messages: Vec<Message>) {
        *self.messages.lock() = messages;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
