use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{Role, Session, UserId},
    events::Toast,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::{emit_toast, toast_channel, Latency, LocalStorage, Scheduler};

/// Storage key of the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "user";

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
const LOGIN_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
const DEMO_PASSWORD: &str = "password";

struct DemoAccount {
    user_id: &'static str,
    name: &'static str,
    email: &'static str,
    role: Role,
    avatar_url: &'static str,
}

const DEMO_ACCOUNTS: [DemoAccount; 2] = [
    DemoAccount {
        user_id: "1",
        name: "Admin User",
        email: "admin@example.com",
        role: Role::Admin,
        avatar_url: "https://i.pravatar.cc/150?u=admin",
    },
    DemoAccount {
        user_id: "2",
        name: "John Doe",
        email: "member@example.com",
        role: Role::Member,
        avatar_url: "https://i.pravatar.cc/150?u=member",
    },
];

fn authenticate(email: &str, password: &str) -> Option<Session> {
    if password != DEMO_PASSWORD {
        return None;
    }
    DEMO_ACCOUNTS
        .iter()
        .find(|account| account.email == email)
        .map(|account| Session {
            user_id: UserId::new(account.user_id),
            name: account.name.to_string(),
            email: account.email.to_string(),
            role: account.role,
            avatar_url: Some(account.avatar_url.to_string()),
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    LoginStart,
    LoginSuccess(Session),
    LoginFailure(String),
    Logout,
    ResetError,
}

pub fn reduce(state: &AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::LoginStart => AuthState {
            is_loading: true,
            error: None,
            ..state.clone()
        },
        AuthAction::LoginSuccess(session) => AuthState {
            session: Some(session),
            is_authenticated: true,
            is_loading: false,
            error: None,
        },
        AuthAction::LoginFailure(message) => AuthState {
            session: None,
            is_authenticated: false,
            is_loading: false,
            error: Some(message),
        },
        AuthAction::Logout => AuthState::default(),
        AuthAction::ResetError => AuthState {
            error: None,
            ..state.clone()
        },
    }
}

/// Owns the current session. Failures are reported through the state
/// snapshot and the toast channel, never returned to the caller.
pub struct AuthStore {
    state: RwLock<AuthState>,
    storage: Arc<dyn LocalStorage>,
    scheduler: Arc<dyn Scheduler>,
    latency: Latency,
    toasts: broadcast::Sender<Toast>,
}

impl AuthStore {
    /// Builds the store, restoring a persisted session when one parses.
    pub async fn restore(
        storage: Arc<dyn LocalStorage>,
        scheduler: Arc<dyn Scheduler>,
        latency: Latency,
    ) -> Arc<Self> {
        let initial = match load_persisted_session(storage.as_ref()).await {
            Some(session) => reduce(&AuthState::default(), AuthAction::LoginSuccess(session)),
            None => AuthState::default(),
        };
        Arc::new(Self {
            state: RwLock::new(initial),
            storage,
            scheduler,
            latency,
            toasts: toast_channel(),
        })
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.toasts.subscribe()
    }

    async fn dispatch(&self, action: AuthAction) {
        let mut guard = self.state.write().await;
        debug!(?action, "auth transition");
        let next = reduce(&guard, action);
        *guard = next;
    }

    pub async fn login(&self, email: &str, password: &str) {
        self.dispatch(AuthAction::LoginStart).await;
        self.scheduler.delay(self.latency.login).await;

        let Some(session) = authenticate(email, password) else {
            info!(%email, "login rejected");
            self.fail_login(INVALID_CREDENTIALS_MESSAGE).await;
            return;
        };

        if let Err(error) = self.persist_session(&session).await {
            warn!(%error, "failed to persist session");
            self.fail_login(LOGIN_ERROR_MESSAGE).await;
            return;
        }

        info!(user_id = %session.user_id, role = session.role.as_str(), "login succeeded");
        self.dispatch(AuthAction::LoginSuccess(session)).await;
        emit_toast(&self.toasts, Toast::success("Login successful"));
    }

    /// A failed login also drops any earlier persisted session, so the next
    /// restore agrees with the unauthenticated state.
    async fn fail_login(&self, message: &str) {
        if let Err(error) = self.storage.remove_item(SESSION_STORAGE_KEY).await {
            warn!(%error, "failed to clear persisted session");
        }
        self.dispatch(AuthAction::LoginFailure(message.to_string()))
            .await;
        emit_toast(&self.toasts, Toast::error(message));
    }

    async fn persist_session(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.storage.set_item(SESSION_STORAGE_KEY, &raw).await
    }

    pub async fn logout(&self) {
        if let Err(error) = self.storage.remove_item(SESSION_STORAGE_KEY).await {
            warn!(%error, "failed to clear persisted session");
        }
        self.dispatch(AuthAction::Logout).await;
        info!("logged out");
        emit_toast(&self.toasts, Toast::info("You have been logged out"));
    }

    /// Always succeeds after the simulated delay; no account lookup happens.
    pub async fn reset_password(&self, email: &str) -> String {
        self.scheduler.delay(self.latency.password_reset).await;
        let message = format!("Password reset instructions sent to {email}");
        info!(%email, "password reset requested");
        emit_toast(&self.toasts, Toast::success(message.clone()));
        message
    }

    pub async fn clear_error(&self) {
        self.dispatch(AuthAction::ResetError).await;
    }
}

async fn load_persisted_session(storage: &dyn LocalStorage) -> Option<Session> {
    let raw = match storage.get_item(SESSION_STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            warn!(%error, "failed to read persisted session");
            return None;
        }
    };

    match serde_json::from_str::<Session>(&raw) {
        Ok(session) => {
            info!(user_id = %session.user_id, "restored persisted session");
            Some(session)
        }
        Err(error) => {
            warn!(%error, "discarding unreadable persisted session");
            if let Err(error) = storage.remove_item(SESSION_STORAGE_KEY).await {
                warn!(%error, "failed to remove unreadable persisted session");
            }
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
