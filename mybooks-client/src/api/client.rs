use super::backend::{ApiRequest, Backend};
use crate::services::metrics;
use crate::session::SessionContext;
use mybooks_core::ApiError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Shared entry point for every service call.
///
/// Attaches the session token, and reacts to authorization failures in one
/// place: a 401 tears the session down (once, however many requests fail
/// together), a 403 is only logged and handed back to the caller.
#[derive(Clone)]
pub struct ApiClient {
    backend: Arc<dyn Backend>,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(backend: Arc<dyn Backend>, session: SessionContext) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let request = match request.bearer {
            Some(_) => request,
            None => request.bearer(self.session.token()),
        };
        let method = request.method.clone();
        let path = request.path.clone();

        let result = self.backend.execute(request).await;

        match &result {
            Ok(_) => metrics::record_api_request(method.as_str(), "ok"),
            Err(e) => {
                metrics::record_api_request(method.as_str(), e.kind());
                self.on_error(method.as_str(), &path, e);
            }
        }

        result
    }

    fn on_error(&self, method: &str, path: &str, error: &ApiError) {
        match error {
            ApiError::Auth(message) => {
                if self.session.expire() {
                    tracing::warn!(method, path, "Session rejected by backend: {}", message);
                }
            }
            ApiError::Permission(message) => {
                tracing::warn!(method, path, "Access denied: {}", message);
            }
            ApiError::Network(e) => {
                tracing::error!(method, path, "Backend unreachable: {}", e);
            }
            other => {
                tracing::debug!(method, path, kind = other.kind(), "Request failed: {}", other);
            }
        }
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::get(path)).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::get(path).params(query)?).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::patch(path).json(body)?).await
    }

    /// Send a request whose response body is irrelevant.
    pub async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(path)).await
    }
}
