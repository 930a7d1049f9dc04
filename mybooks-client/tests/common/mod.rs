#![allow(dead_code)]

use chrono::{Duration, Utc};
use mybooks_client::api::{Backend, FixtureBackend, HttpBackend};
use mybooks_client::config::ApiSettings;
use mybooks_client::models::{Credentials, User};
use mybooks_client::storage::MemoryStorage;
use mybooks_client::utils::jwt::{unsigned_token, JwtClaims};
use mybooks_client::MyBooks;
use std::sync::Arc;

pub const READER_EMAIL: &str = "reader@mybooks.test";
pub const READER_PASSWORD: &str = "reader123";
pub const ADMIN_EMAIL: &str = "admin@mybooks.test";
pub const ADMIN_PASSWORD: &str = "admin123";

/// A client wired to the in-memory fixture backend.
pub struct TestApp {
    pub backend: Arc<FixtureBackend>,
    pub storage: Arc<MemoryStorage>,
    pub app: MyBooks,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_backend(Arc::new(FixtureBackend::new()))
    }

    pub fn with_backend(backend: Arc<FixtureBackend>) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let app = MyBooks::new(backend.clone(), storage.clone());
        Self {
            backend,
            storage,
            app,
        }
    }

    /// Another client sharing this one's backend and local storage, as after
    /// a page reload.
    pub fn reload(&self) -> MyBooks {
        MyBooks::new(self.backend.clone(), self.storage.clone())
    }

    pub async fn login_reader(&self) {
        self.app
            .login(&Credentials::new(READER_EMAIL, READER_PASSWORD))
            .await
            .expect("reader login failed");
    }

    pub async fn login_admin(&self) {
        self.app
            .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .expect("admin login failed");
    }
}

/// A client talking HTTP to `base_url`, typically a wiremock server.
pub fn http_app(base_url: &str) -> (MyBooks, Arc<MemoryStorage>) {
    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(&ApiSettings {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        })
        .expect("Failed to build HTTP backend"),
    );
    let storage = Arc::new(MemoryStorage::new());
    (MyBooks::new(backend, storage.clone()), storage)
}

pub fn token_valid_for(duration: Duration) -> String {
    unsigned_token(&JwtClaims {
        sub: Some("2".to_string()),
        exp: Some((Utc::now() + duration).timestamp()),
        iat: Some(Utc::now().timestamp()),
        roles: vec!["USER".to_string()],
    })
    .expect("Failed to build token")
}

pub fn reader() -> User {
    serde_json::from_value(serde_json::json!({
        "id": 2,
        "username": "reader",
        "email": READER_EMAIL,
        "role": "USER"
    }))
    .expect("Failed to build user")
}
