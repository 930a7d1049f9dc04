use super::{into_items, into_page, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{NewUser, Page, User, UserId, UserQuery, UserStatus, UserUpdate};
use mybooks_core::ApiError;
use serde_json::json;
use validator::Validate;

/// Back-office account management.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, query: &UserQuery) -> Page<User> {
        or_empty(self.fetch_page(query).await, "users")
    }

    async fn fetch_page(&self, query: &UserQuery) -> Result<Page<User>, ApiError> {
        let value = self.api.send(ApiRequest::get("/users").params(query)?).await?;
        into_page(value)
    }

    pub async fn all(&self) -> Result<Vec<User>, ApiError> {
        let value = self.api.send(ApiRequest::get("/users")).await?;
        into_items(value)
    }

    pub async fn get(&self, id: UserId) -> Result<User, ApiError> {
        self.api.get(&format!("/users/{}", id)).await
    }

    pub async fn create(&self, user: NewUser) -> Result<User, ApiError> {
        let user = user.cleaned();
        user.validate()?;
        let created: User = self.api.post("/users", &user).await?;
        tracing::info!(user_id = created.id, "User created");
        Ok(created)
    }

    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, ApiError> {
        update.validate()?;
        self.api.put(&format!("/users/{}", id), update).await
    }

    pub async fn delete(&self, id: UserId) -> Result<(), ApiError> {
        self.api.delete(&format!("/users/{}", id)).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn update_status(&self, id: UserId, status: UserStatus) -> Result<User, ApiError> {
        self.api
            .patch(&format!("/users/{}/status", id), &json!({ "status": status }))
            .await
    }
}
