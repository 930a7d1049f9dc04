//! Request correlation for calls to the bookstore backend.
//!
//! Every outgoing request carries an `x-request-id` header so that a client
//! log line can be matched with the backend's access log.

use reqwest::Method;

/// Header name for request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Wraps reqwest's RequestBuilder so the correlation id is never forgotten.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
    request_id: String,
}

impl TracedRequest {
    pub fn new(request: reqwest::RequestBuilder) -> Self {
        Self {
            request,
            request_id: new_request_id(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        Self {
            request: self.request.json(json),
            ..self
        }
    }

    pub fn query<T: serde::Serialize + ?Sized>(self, query: &T) -> Self {
        Self {
            request: self.request.query(query),
            ..self
        }
    }

    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
            ..self
        }
    }

    /// Send the request with the correlation header attached.
    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        self.request
            .header(REQUEST_ID_HEADER, self.request_id.as_str())
            .send()
            .await
    }
}

/// Extension trait for reqwest::Client to create traced requests.
pub trait TracedClientExt {
    fn traced_request(&self, method: Method, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_request(&self, method: Method, url: &str) -> TracedRequest {
        TracedRequest::new(self.request(method, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_uuids() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn traced_request_carries_its_id() {
        let client = reqwest::Client::new();
        let request = client.traced_request(Method::GET, "http://localhost/books");
        assert!(uuid::Uuid::parse_str(request.request_id()).is_ok());
    }
}
