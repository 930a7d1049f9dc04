use crate::api::{ApiClient, ApiRequest};
use crate::models::{
    Availability, Credentials, LoginResponse, PasswordChange, PasswordReset, ProfileUpdate,
    RegisterRequest, RegisterResponse, Registration, Role, User,
};
use crate::session::{Session, SessionContext};
use chrono::Utc;
use mybooks_core::ApiError;
use secrecy::Secret;
use serde_json::{json, Value};
use validator::Validate;

/// Login, logout and account management on top of the shared session.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionContext {
        self.api.session()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        credentials.validate()?;

        let response: LoginResponse = self
            .api
            .post("/auth/login", credentials)
            .await
            .map_err(|e| match e {
                // The backend answers bad credentials with 400 or 401
                ApiError::BadRequest(message) => ApiError::Auth(message),
                other => other,
            })?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Auth("unexpected response: no token issued".to_string()))?;

        let user = match response.user {
            Some(user) => user,
            None => self.fetch_user_with(&token).await?,
        };

        let session = self.session().establish(token, user)?;
        tracing::info!(user_id = session.user.id, "User logged in");
        Ok(session)
    }

    async fn fetch_user_with(&self, token: &str) -> Result<User, ApiError> {
        self.api
            .fetch(ApiRequest::get("/users/me").bearer(Some(Secret::new(token.to_string()))))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError> {
        request.validate()?;

        let response: RegisterResponse = self.api.post("/auth/register", request).await?;

        match (response.token.filter(|t| !t.is_empty()), response.user) {
            (Some(token), Some(user)) => {
                let session = self.session().establish(token, user)?;
                tracing::info!(user_id = session.user.id, "Registered and logged in");
                Ok(Registration::LoggedIn(session.user))
            }
            (Some(token), None) => {
                let user = self.fetch_user_with(&token).await?;
                let session = self.session().establish(token, user)?;
                Ok(Registration::LoggedIn(session.user))
            }
            (None, _) => Ok(Registration::ConfirmationRequired {
                message: response
                    .message
                    .unwrap_or_else(|| "Inscription réussie".to_string()),
            }),
        }
    }

    pub fn logout(&self) {
        if let Some(user) = self.session().current_user() {
            tracing::info!(user_id = user.id, "User logged out");
        }
        self.session().clear();
    }

    /// Reload the persisted session at startup.
    pub fn restore(&self) -> Option<User> {
        self.session().restore(Utc::now())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session().current_user()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.session().has_role(role)
    }

    /// Fetch the profile from the backend and cache it in the session.
    pub async fn refresh_profile(&self) -> Result<User, ApiError> {
        let user: User = self.api.get("/users/me").await?;
        self.session().update_user(user.clone())?;
        Ok(user)
    }

    /// The cached user, or a fresh fetch when none is cached yet.
    pub async fn ensure_user(&self) -> Result<User, ApiError> {
        match self.current_user() {
            Some(user) => Ok(user),
            None => self.refresh_profile().await,
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        update.validate()?;
        let user: User = self.api.put("/auth/profile", update).await?;
        self.session().update_user(user.clone())?;
        Ok(user)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        change.validate()?;
        self.api
            .execute(ApiRequest::put("/auth/change-password").json(change)?)
            .await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        self.api
            .execute(ApiRequest::post("/auth/forgot-password").with_body(json!({ "email": email })))
            .await
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ApiError> {
        reset.validate()?;
        self.api
            .execute(ApiRequest::post("/auth/reset-password").json(reset)?)
            .await
    }

    pub async fn check_email(&self, email: &str) -> Result<Availability, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get("/auth/check-email").param("email", email))
            .await?;
        Ok(availability(value)?)
    }

    pub async fn check_username(&self, username: &str) -> Result<Availability, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get("/auth/check-username").param("username", username))
            .await?;
        Ok(availability(value)?)
    }

    pub async fn activate_account(&self, token: &str) -> Result<(), ApiError> {
        self.api
            .execute(ApiRequest::post("/auth/activate").with_body(json!({ "token": token })))
            .await
    }

    pub async fn resend_activation_email(&self, email: &str) -> Result<(), ApiError> {
        self.api
            .execute(ApiRequest::post("/auth/resend-activation").with_body(json!({ "email": email })))
            .await
    }
}

/// The availability endpoints answer either `{"available": bool}` or a bare
/// boolean.
fn availability(value: Value) -> Result<Availability, serde_json::Error> {
    match value {
        Value::Bool(available) => Ok(Availability {
            available,
            message: None,
        }),
        other => serde_json::from_value(other),
    }
}
