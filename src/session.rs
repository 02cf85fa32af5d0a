// Authenticated session shared by the API client and everything that renders signed-in state
use crate::models::AdminUser;
use parking_lot::RwLock;
use std::fmt;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AuthState {
    pub token: String,
    pub user: AdminUser,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn { email: String },
}

// Only the API client writes here (login, logout, 401); everyone else reads or subscribes
#[derive(Debug)]
pub struct Session {
    auth: RwLock<Option<AuthState>>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::SignedOut);
        Self {
            auth: RwLock::new(None),
            state,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.auth.read().as_ref().map(|auth| auth.token.clone())
    }

    pub fn user(&self) -> Option<AdminUser> {
        self.auth.read().as_ref().map(|auth| auth.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.read().is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn sign_in(&self, token: String, user: AdminUser) {
        let email = user.email.clone();
        *self.auth.write() = Some(AuthState { token, user });
        info!("Signed in as {}", email);
        self.state.send_replace(SessionState::SignedIn { email });
    }

    // Returns false when there was no session to clear
    pub(crate) fn clear(&self, reason: &str) -> bool {
        let previous = self.auth.write().take();
        if previous.is_none() {
            return false;
        }

        warn!("Session cleared: {}", reason);
        self.state.send_replace(SessionState::SignedOut);
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
