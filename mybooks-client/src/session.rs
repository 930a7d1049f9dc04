//! Session context shared by the API client, auth service and basket.
//!
//! The context is created once and handed to every component that needs the
//! current token; nothing reads the token from storage per request.

use crate::models::{Role, User};
use crate::storage::{load_json, save_json, Storage, SESSION_KEY};
use crate::utils::jwt;
use chrono::{DateTime, Utc};
use mybooks_core::ApiError;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct Session {
    token: Secret<String>,
    pub user: User,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(token: String, user: User) -> Self {
        let expires_at = jwt::token_expiry(&token);
        Self {
            token: Secret::new(token),
            user,
            expires_at,
        }
    }

    pub fn token(&self) -> &Secret<String> {
        &self.token
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        jwt::is_unexpired(self.expires_at, now)
    }
}

/// What subscribers are told when the session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn(User),
    ProfileUpdated(User),
    LoggedOut,
    /// The backend rejected the token; the session was torn down.
    Expired,
}

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    user: User,
}

#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    current: RwLock<Option<Session>>,
    storage: Arc<dyn Storage>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(None),
                storage,
                events,
            }),
        }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.inner.storage.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Reload the persisted session, keeping it only while its token is valid.
    pub fn restore(&self, now: DateTime<Utc>) -> Option<User> {
        let persisted: Option<PersistedSession> =
            match load_json(self.inner.storage.as_ref(), SESSION_KEY) {
                Ok(persisted) => persisted,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable persisted session");
                    self.forget_persisted();
                    None
                }
            };

        let session = match persisted {
            Some(p) => Session::new(p.token, p.user),
            None => return None,
        };

        if !session.is_valid_at(now) {
            tracing::info!("Persisted session has expired");
            self.forget_persisted();
            return None;
        }

        let user = session.user.clone();
        *self.write() = Some(session);
        tracing::debug!(user_id = user.id, "Session restored");
        Some(user)
    }

    /// Install a freshly issued session and persist it.
    pub fn establish(&self, token: String, user: User) -> Result<Session, ApiError> {
        let session = Session::new(token, user);

        save_json(
            self.inner.storage.as_ref(),
            SESSION_KEY,
            &PersistedSession {
                token: session.token.expose_secret().clone(),
                user: session.user.clone(),
            },
        )?;

        *self.write() = Some(session.clone());
        self.publish(SessionEvent::LoggedIn(session.user.clone()));
        Ok(session)
    }

    /// Replace the cached user, e.g. after a profile fetch.
    pub fn update_user(&self, user: User) -> Result<(), ApiError> {
        let persisted = {
            let mut guard = self.write();
            let Some(session) = guard.as_mut() else {
                return Ok(());
            };
            session.user = user.clone();
            PersistedSession {
                token: session.token.expose_secret().clone(),
                user: user.clone(),
            }
        };

        save_json(self.inner.storage.as_ref(), SESSION_KEY, &persisted)?;
        self.publish(SessionEvent::ProfileUpdated(user));
        Ok(())
    }

    /// Explicit logout.
    pub fn clear(&self) {
        let had_session = self.write().take().is_some();
        self.forget_persisted();
        if had_session {
            self.publish(SessionEvent::LoggedOut);
        }
    }

    /// Tear the session down after the backend rejected it.
    ///
    /// Returns true only for the call that actually removed a session, so
    /// a burst of 401 responses yields a single `Expired` event.
    pub fn expire(&self) -> bool {
        let removed = self.write().take().is_some();
        if removed {
            self.forget_persisted();
            self.publish(SessionEvent::Expired);
        }
        removed
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn token(&self) -> Option<Secret<String>> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        self.read()
            .as_ref()
            .map(|s| s.is_valid_at(now))
            .unwrap_or(false)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.read()
            .as_ref()
            .map(|s| s.user.has_role(role))
            .unwrap_or(false)
    }

    fn forget_persisted(&self) {
        if let Err(e) = self.inner.storage.remove(SESSION_KEY) {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
