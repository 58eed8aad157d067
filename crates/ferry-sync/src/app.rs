//! # Composition root
//!
//! [`FerryApp`] wires the session gate, the API client, the view
//! controllers and their pollers together, and owns the single
//! unauthorized-event subscription that performs forced logout.
//!
//! Controllers never own their pollers. The app starts a poller when its
//! screen is shown and stops it when the screen goes away.

use std::sync::{Arc, Weak};
use std::time::Duration;

use ferry_auth::{AuthError, CredentialStore, SessionGate, Subscription, UnauthorizedBus};
use ferry_client::{ApiClient, ReqwestTransport, Transport, TransportError};
use ferry_core::TaskId;
use ferry_settings::FerrySettings;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::board::TaskBoard;
use crate::chat_list::ChatList;
use crate::chat_room::ChatRoom;
use crate::errors::SyncError;
use crate::navigation::{Navigator, Screen};
use crate::poller::{AdaptivePoller, PollEvent};

const EVENT_CAPACITY: usize = 64;

/// The running client.
pub struct FerryApp {
    settings: FerrySettings,
    gate: Arc<SessionGate>,
    client: ApiClient,
    navigator: Navigator,
    board: Arc<TaskBoard>,
    chats: Arc<ChatList>,
    room: Mutex<Option<Arc<ChatRoom>>>,
    tasks_poller: AdaptivePoller,
    contacts_poller: AdaptivePoller,
    conversation_poller: AdaptivePoller,
    events: broadcast::Sender<PollEvent>,
    _unauthorized: Subscription,
}

impl std::fmt::Debug for FerryApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FerryApp")
            .field("screen", &self.navigator.current())
            .field("authenticated", &self.gate.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl FerryApp {
    /// Compose the app over `transport`, restoring any session persisted in
    /// `store`. Starts on [`Screen::Tasks`] with a stored token, else on
    /// [`Screen::Login`]. No poller runs until a screen is shown.
    pub fn new(
        settings: FerrySettings,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let gate = Arc::new(SessionGate::restore(store, UnauthorizedBus::new()));
            let client = ApiClient::new(transport, Arc::clone(&gate), &settings.api);

            let weak = this.clone();
            let unauthorized = gate.subscribe(move |reason| {
                if let Some(app) = weak.upgrade() {
                    app.handle_unauthorized(reason);
                }
            });

            let initial = if gate.is_authenticated() {
                Screen::Tasks
            } else {
                Screen::Login
            };
            let (events, _) = broadcast::channel(EVENT_CAPACITY);
            let polling = &settings.polling;

            Self {
                navigator: Navigator::new(initial),
                board: Arc::new(TaskBoard::new(client.clone())),
                chats: Arc::new(ChatList::new(client.clone())),
                room: Mutex::new(None),
                tasks_poller: AdaptivePoller::new(
                    "tasks",
                    polling.tasks_interval(),
                    events.clone(),
                ),
                contacts_poller: AdaptivePoller::new(
                    "contacts",
                    polling.contacts_interval(),
                    events.clone(),
                ),
                conversation_poller: AdaptivePoller::new(
                    "conversation",
                    polling.conversation_interval(),
                    events.clone(),
                ),
                events,
                _unauthorized: unauthorized,
                gate,
                client,
                settings,
            }
        })
    }

    /// Compose the app over a [`ReqwestTransport`] using the configured
    /// request timeout.
    pub fn from_settings(
        settings: FerrySettings,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Arc<Self>, TransportError> {
        let transport = ReqwestTransport::new(settings.api.request_timeout())?;
        Ok(Self::new(settings, Arc::new(transport), store))
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Effective settings.
    pub fn settings(&self) -> &FerrySettings {
        &self.settings
    }

    /// Session gate.
    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    /// API client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Screen state.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Task board controller.
    pub fn board(&self) -> &Arc<TaskBoard> {
        &self.board
    }

    /// Chat list controller.
    pub fn chats(&self) -> &Arc<ChatList> {
        &self.chats
    }

    /// The open conversation, if any.
    pub fn room(&self) -> Option<Arc<ChatRoom>> {
        self.room.lock().clone()
    }

    /// Task board poller.
    pub fn tasks_poller(&self) -> &AdaptivePoller {
        &self.tasks_poller
    }

    /// Contact list poller.
    pub fn contacts_poller(&self) -> &AdaptivePoller {
        &self.contacts_poller
    }

    /// Conversation poller.
    pub fn conversation_poller(&self) -> &AdaptivePoller {
        &self.conversation_poller
    }

    /// Receive poll events from every poller.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Probe a restored session. Shows the task board when it is still
    /// accepted, the sign-in screen otherwise.
    pub async fn boot(&self) -> Screen {
        let screen = if self.client.validate_session().await {
            Screen::Tasks
        } else {
            Screen::Login
        };
        self.show(screen.clone());
        screen
    }

    /// Store a freshly issued token and show the task board.
    pub fn login(&self, token: &str) -> Result<(), AuthError> {
        self.gate.set_session(token)?;
        info!("signed in");
        self.show(Screen::Tasks);
        Ok(())
    }

    /// Explicit sign-out.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.teardown();
        self.gate.clear_session()?;
        self.navigator.go(Screen::Login);
        info!("signed out");
        Ok(())
    }

    fn handle_unauthorized(&self, reason: &str) {
        warn!(reason, "forced logout");
        if let Err(e) = self.gate.clear_stored_keys() {
            warn!(error = %e, "failed to clear stored session keys");
        }
        self.teardown();
        self.navigator.reset_to_login(reason);
    }

    fn teardown(&self) {
        self.stop_pollers();
        self.board.clear();
        self.chats.clear();
        *self.room.lock() = None;
    }

    // ── Screens ─────────────────────────────────────────────────────

    /// Show `screen`, mounting its poller and unmounting the others.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn show(&self, screen: Screen) {
        match &screen {
            Screen::Login => self.stop_pollers(),
            Screen::Tasks => {
                self.contacts_poller.stop();
                self.conversation_poller.stop();
                self.tasks_poller.start(Arc::clone(&self.board));
            }
            Screen::Chats => {
                self.tasks_poller.stop();
                self.conversation_poller.stop();
                self.contacts_poller.start(Arc::clone(&self.chats));
            }
            Screen::ChatRoom { contact_id } => {
                self.tasks_poller.stop();
                self.contacts_poller.stop();
                let room = self.room_for(*contact_id);
                self.conversation_poller.start(room);
            }
        }
        self.navigator.go(screen);
    }

    fn room_for(&self, contact_id: i64) -> Arc<ChatRoom> {
        let mut slot = self.room.lock();
        if let Some(room) = slot.as_ref().filter(|r| r.contact_id() == contact_id) {
            return Arc::clone(room);
        }
        // A different room's poller must not keep feeding the old one.
        self.conversation_poller.stop();
        let room = Arc::new(ChatRoom::new(self.client.clone(), contact_id));
        *slot = Some(Arc::clone(&room));
        room
    }

    fn stop_pollers(&self) {
        self.tasks_poller.stop();
        self.contacts_poller.stop();
        self.conversation_poller.stop();
    }

    /// Application foreground/background transition, applied to every
    /// poller.
    pub fn set_foreground(&self, foreground: bool) {
        debug!(foreground, "app state changed");
        self.tasks_poller.set_foreground(foreground);
        self.contacts_poller.set_foreground(foreground);
        self.conversation_poller.set_foreground(foreground);
    }

    /// Open the new-chat picker. The contact poller is paused while it is
    /// open.
    pub async fn open_new_chat(&self) -> Result<(), SyncError> {
        self.contacts_poller.set_blocked(true);
        self.chats.load_users().await
    }

    /// Close the new-chat picker and resume the contact poller.
    pub fn close_new_chat(&self) {
        self.chats.reset_picker();
        self.contacts_poller.set_blocked(false);
    }

    /// Open a conversation, resolving the signed-in user first.
    pub async fn open_chat(&self, contact_id: i64) -> Arc<ChatRoom> {
        let room = self.room_for(contact_id);
        if room.me().is_none() {
            room.load_me().await;
        }
        self.show(Screen::ChatRoom { contact_id });
        room
    }

    /// Start a chat from the new-chat picker.
    pub async fn start_chat_with(&self, user_id: i64) -> Arc<ChatRoom> {
        self.close_new_chat();
        self.open_chat(user_id).await
    }

    /// Deep link to a conversation. Opens it only when `contact_id` is on a
    /// freshly fetched contact list; returns whether it did.
    pub async fn open_chat_by_contact_id(&self, contact_id: i64) -> Result<bool, SyncError> {
        if self.chats.find_contact(contact_id).await?.is_none() {
            debug!(contact_id, "deep link to unknown contact");
            return Ok(false);
        }
        let _room = self.open_chat(contact_id).await;
        Ok(true)
    }

    /// Deep link to a task: show the board and open the task's detail.
    pub async fn open_task_by_id(&self, id: TaskId) -> Result<(), SyncError> {
        self.show(Screen::Tasks);
        self.board.open_task_by_id(id).await
    }

    /// Interval of the poller backing `screen`, if it has one.
    pub fn poll_interval(&self, screen: &Screen) -> Option<Duration> {
        let polling = &self.settings.polling;
        match screen {
            Screen::Login => None,
            Screen::Tasks => Some(polling.tasks_interval()),
            Screen::Chats => Some(polling.contacts_interval()),
            Screen::ChatRoom { .. } => Some(polling.conversation_interval()),
        }
    }
}

impl Drop for FerryApp {
    fn drop(&mut self) {
        self.stop_pollers();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
