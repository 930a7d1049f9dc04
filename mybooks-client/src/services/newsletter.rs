use crate::api::{ApiClient, ApiRequest};
use crate::models::{NewsletterPreferences, SubscriptionStatus};
use mybooks_core::ApiError;
use serde_json::json;

#[derive(Clone)]
pub struct NewsletterService {
    api: ApiClient,
}

impl NewsletterService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn subscribe(&self, email: &str) -> Result<(), ApiError> {
        self.api
            .execute(ApiRequest::post("/newsletter/subscribe").with_body(json!({ "email": email })))
            .await
    }

    /// `token` comes from the unsubscribe link in the newsletter email.
    pub async fn unsubscribe(&self, email: &str, token: &str) -> Result<(), ApiError> {
        self.api
            .execute(
                ApiRequest::post("/newsletter/unsubscribe")
                    .with_body(json!({ "email": email, "token": token })),
            )
            .await
    }

    pub async fn check(&self, email: &str) -> Result<SubscriptionStatus, ApiError> {
        self.api
            .fetch(ApiRequest::get("/newsletter/check").param("email", email))
            .await
    }

    pub async fn update_preferences(
        &self,
        email: &str,
        preferences: &NewsletterPreferences,
    ) -> Result<(), ApiError> {
        self.api
            .execute(
                ApiRequest::put("/newsletter/preferences")
                    .with_body(json!({ "email": email, "preferences": preferences })),
            )
            .await
    }
}
