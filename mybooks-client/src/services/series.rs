use super::{into_items, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{Book, Series};
use mybooks_core::ApiError;

#[derive(Clone)]
pub struct SeriesService {
    api: ApiClient,
}

impl SeriesService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Vec<Series> {
        or_empty(self.items("/series".to_string()).await, "series")
    }

    pub async fn get(&self, id: i64) -> Result<Series, ApiError> {
        self.api.get(&format!("/series/{}", id)).await
    }

    pub async fn books(&self, id: i64) -> Vec<Book> {
        or_empty(self.items(format!("/series/{}/books", id)).await, "series books")
    }

    async fn items<T: serde::de::DeserializeOwned>(&self, path: String) -> Result<Vec<T>, ApiError> {
        let value = self.api.send(ApiRequest::get(path)).await?;
        into_items(value)
    }
}
