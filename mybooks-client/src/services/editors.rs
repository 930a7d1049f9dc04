use super::{into_items, into_page, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{Editor, EditorId, EditorInput, Page, PageRequest};
use mybooks_core::ApiError;
use validator::Validate;

#[derive(Clone)]
pub struct EditorService {
    api: ApiClient,
}

impl EditorService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, page: PageRequest) -> Page<Editor> {
        or_empty(self.fetch_page(page).await, "editors")
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Page<Editor>, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get("/editors").params(&page)?)
            .await?;
        into_page(value)
    }

    pub async fn get(&self, id: EditorId) -> Result<Editor, ApiError> {
        self.api.get(&format!("/editors/{}", id)).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Editor>, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get("/editors/search").param("query", query.trim()))
            .await?;
        into_items(value)
    }

    pub async fn create(&self, input: &EditorInput) -> Result<Editor, ApiError> {
        input.validate()?;
        self.api.post("/editors", input).await
    }

    pub async fn update(&self, id: EditorId, input: &EditorInput) -> Result<Editor, ApiError> {
        input.validate()?;
        self.api.put(&format!("/editors/{}", id), input).await
    }

    pub async fn delete(&self, id: EditorId) -> Result<(), ApiError> {
        self.api.delete(&format!("/editors/{}", id)).await
    }
}
