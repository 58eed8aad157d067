//! Screen stack.

use parking_lot::Mutex;
use tracing::debug;

/// A top-level screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Sign-in form.
    Login,
    /// Task board.
    Tasks,
    /// Contact list.
    Chats,
    /// Conversation with one contact.
    ChatRoom {
        /// The other participant.
        contact_id: i64,
    },
}

#[derive(Debug)]
struct NavState {
    current: Screen,
    logout_reason: Option<String>,
}

/// Which screen is showing, plus the reason for the last forced logout.
#[derive(Debug)]
pub struct Navigator {
    state: Mutex<NavState>,
}

impl Navigator {
    /// Navigator showing `initial`.
    pub fn new(initial: Screen) -> Self {
        Self {
            state: Mutex::new(NavState {
                current: initial,
                logout_reason: None,
            }),
        }
    }

    /// Current screen.
    pub fn current(&self) -> Screen {
        self.state.lock().current.clone()
    }

    /// Show `screen`.
    pub fn go(&self, screen: Screen) {
        debug!(?screen, "navigate");
        self.state.lock().current = screen;
    }

    /// Reset to the sign-in screen, keeping `reason` for it to show.
    pub fn reset_to_login(&self, reason: &str) {
        let mut state = self.state.lock();
        state.current = Screen::Login;
        state.logout_reason = Some(reason.to_string());
    }

    /// Take the pending logout reason, once.
    pub fn take_logout_reason(&self) -> Option<String> {
        self.state.lock().logout_reason.take()
    }
}
