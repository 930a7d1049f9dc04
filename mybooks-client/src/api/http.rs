use super::backend::{ApiRequest, Backend};
use crate::config::ApiSettings;
use async_trait::async_trait;
use mybooks_core::observability::TracedClientExt;
use mybooks_core::ApiError;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;

/// Talks to the real backend over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut outgoing = self.client.traced_request(request.method.clone(), &url);
        if !request.query.is_empty() {
            outgoing = outgoing.query(&request.query);
        }
        if let Some(body) = &request.body {
            outgoing = outgoing.json(body);
        }
        if let Some(token) = &request.bearer {
            outgoing = outgoing.bearer_auth(token.expose_secret());
        }

        let request_id = outgoing.request_id().to_string();
        let response = outgoing.send().await.map_err(|e| {
            tracing::error!(
                request_id = %request_id,
                method = %request.method,
                "Failed to send request to {}: {}",
                url,
                e
            );
            ApiError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                request_id = %request_id,
                status = status.as_u16(),
                "Backend rejected {} {}",
                request.method,
                request.path
            );
            return Err(ApiError::from_status(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            // Some endpoints answer with a bare confirmation string
            Err(_) => Ok(Value::String(body)),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
