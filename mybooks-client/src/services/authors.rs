use super::{into_items, into_page, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{Author, AuthorId, AuthorInput, Book, Page, PageRequest};
use mybooks_core::ApiError;
use serde_json::json;
use validator::Validate;

#[derive(Clone)]
pub struct AuthorService {
    api: ApiClient,
}

impl AuthorService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, page: PageRequest) -> Page<Author> {
        or_empty(self.fetch_page(page).await, "authors")
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Page<Author>, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get("/authors").params(&page)?)
            .await?;
        into_page(value)
    }

    pub async fn get(&self, id: AuthorId) -> Result<Author, ApiError> {
        self.api.get(&format!("/authors/{}", id)).await
    }

    /// Create an author, optionally with the login account attached in
    /// `input.user`.
    pub async fn create(&self, input: AuthorInput) -> Result<Author, ApiError> {
        let input = input.cleaned();
        input.validate()?;
        if let Some(user) = &input.user {
            user.validate()?;
        }

        let author: Author = self.api.post("/authors", &input).await?;
        tracing::info!(author_id = author.id, "Author created");
        Ok(author)
    }

    pub async fn update(&self, id: AuthorId, input: AuthorInput) -> Result<Author, ApiError> {
        let input = input.cleaned();
        input.validate()?;
        self.api.put(&format!("/authors/{}", id), &input).await
    }

    pub async fn delete(&self, id: AuthorId) -> Result<(), ApiError> {
        self.api.delete(&format!("/authors/{}", id)).await
    }

    pub async fn books(&self, id: AuthorId) -> Result<Vec<Book>, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get(format!("/authors/{}/books", id)))
            .await?;
        into_items(value)
    }

    /// Set a new password on the author's login account.
    pub async fn reset_password(&self, id: AuthorId, password: &str) -> Result<(), ApiError> {
        if password.chars().count() < 8 {
            return Err(ApiError::invalid(
                "password",
                "length",
                "Password must be at least 8 characters",
            ));
        }
        self.api
            .execute(
                ApiRequest::post(format!("/authors/{}/reset-password", id))
                    .with_body(json!({ "password": password })),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FixtureBackend;
    use crate::models::NewUser;
    use crate::session::SessionContext;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn service() -> AuthorService {
        let session = SessionContext::new(Arc::new(MemoryStorage::new()));
        AuthorService::new(ApiClient::new(Arc::new(FixtureBackend::new()), session))
    }

    #[tokio::test]
    async fn invalid_attached_account_is_rejected_before_sending() {
        let result = service()
            .create(AuthorInput {
                first_name: "Marguerite".into(),
                last_name: "Duras".into(),
                user: Some(NewUser {
                    username: "mduras".into(),
                    email: "not-an-email".into(),
                    password: "longpassword".into(),
                    role: None,
                }),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn short_reset_password_is_rejected() {
        let result = service().reset_password(1, "short").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn author_list_degrades_when_unavailable() {
        assert!(service().list(PageRequest::default()).await.is_empty());
    }
}
