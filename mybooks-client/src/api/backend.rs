use async_trait::async_trait;
use mybooks_core::ApiError;
use reqwest::Method;
use secrecy::Secret;
use serde::Serialize;
use serde_json::Value;

/// One call against the bookstore REST API, independent of transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<Secret<String>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Flatten a serializable struct into query parameters, skipping unset
    /// fields.
    pub fn params<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self, ApiError> {
        match serde_json::to_value(params)? {
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::Null => {}
                        Value::String(s) => self.query.push((key, s)),
                        other => self.query.push((key, other.to_string())),
                    }
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(ApiError::BadRequest(format!(
                "query parameters must be an object, got {}",
                other
            ))),
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: Option<Secret<String>>) -> Self {
        self.bearer = token;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport seam: the real HTTP client or the in-memory fixture.
///
/// Implementations return the decoded JSON body (`Value::Null` for empty
/// bodies) or an error already mapped onto the `ApiError` taxonomy.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderQuery;

    #[test]
    fn params_skip_unset_fields() {
        let request = ApiRequest::get("/orders")
            .params(&OrderQuery::first_page())
            .unwrap();
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "0".to_string()),
                ("size".to_string(), "10".to_string())
            ]
        );
    }

    #[test]
    fn string_params_are_not_quoted() {
        let request = ApiRequest::get("/books/search/title")
            .params(&serde_json::json!({ "title": "Dune", "limit": 5 }))
            .unwrap();
        assert_eq!(request.query_value("title"), Some("Dune"));
        assert_eq!(request.query_value("limit"), Some("5"));
    }

    #[test]
    fn non_object_params_are_rejected() {
        assert!(ApiRequest::get("/books").params(&[1, 2]).is_err());
    }
}
