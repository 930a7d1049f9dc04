//! Toast-style notifications shown by the UI layer.
//!
//! Expiry is evaluated lazily against the clock passed to
//! [`NotificationCenter::active_at`]. Dismissed and expired entries are
//! dropped on the next push, so the list only holds what can still show.

use chrono::{DateTime, Duration, Utc};
use mybooks_core::ApiError;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn default_duration(self) -> Duration {
        match self {
            NotificationKind::Success => Duration::milliseconds(3000),
            NotificationKind::Info | NotificationKind::Warning => Duration::milliseconds(5000),
            NotificationKind::Error => Duration::milliseconds(8000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// `None` keeps the notification until it is dismissed.
    #[serde(skip)]
    pub duration: Option<Duration>,
    pub dismissed: bool,
}

impl Notification {
    fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.dismissed {
            return false;
        }
        match self.duration {
            Some(duration) => now < self.created_at + duration,
            None => true,
        }
    }
}

#[derive(Default)]
struct State {
    next_id: u64,
    entries: Vec<Notification>,
}

#[derive(Default)]
pub struct NotificationCenter {
    state: Mutex<State>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a notification with the kind's default lifetime.
    pub fn push(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, Some(kind.default_duration()), Utc::now())
    }

    /// Queue a notification that stays until dismissed.
    pub fn push_sticky(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, None, Utc::now())
    }

    pub fn push_at(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Option<Duration>,
        now: DateTime<Utc>,
    ) -> u64 {
        let mut state = self.lock();
        state.entries.retain(|n| n.is_active_at(now));
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(Notification {
            id,
            kind,
            message: message.into(),
            created_at: now,
            duration,
            dismissed: false,
        });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Error, message)
    }

    /// Turn a failed call into a user-facing message. Network failures get a
    /// generic wording; everything else shows the backend's message.
    pub fn report_error(&self, error: &ApiError) -> u64 {
        let message = match error {
            ApiError::Network(_) => {
                "Impossible de contacter le serveur. Vérifiez votre connexion.".to_string()
            }
            ApiError::Auth(_) => "Votre session a expiré. Veuillez vous reconnecter.".to_string(),
            ApiError::Permission(_) => {
                "Vous n'avez pas les droits nécessaires pour cette action.".to_string()
            }
            other => other.to_string(),
        };
        self.error(message)
    }

    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Utc::now())
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.lock()
            .entries
            .iter()
            .filter(|n| n.is_active_at(now))
            .cloned()
            .collect()
    }

    /// Returns false for an unknown id.
    pub fn dismiss(&self, id: u64) -> bool {
        match self.lock().entries.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.dismissed = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Entries still held, shown or not.
    pub fn retained(&self) -> usize {
        self.lock().entries.len()
    }
}
