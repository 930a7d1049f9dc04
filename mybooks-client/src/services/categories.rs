use super::{into_items, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{Category, CategoryId, CategoryInput};
use mybooks_core::ApiError;
use validator::Validate;

#[derive(Clone)]
pub struct CategoryService {
    api: ApiClient,
}

impl CategoryService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Vec<Category> {
        or_empty(self.fetch_all().await, "categories")
    }

    async fn fetch_all(&self) -> Result<Vec<Category>, ApiError> {
        let value = self.api.send(ApiRequest::get("/categories")).await?;
        into_items(value)
    }

    pub async fn get(&self, id: CategoryId) -> Result<Category, ApiError> {
        self.api.get(&format!("/categories/{}", id)).await
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        input.validate()?;
        self.api.post("/categories", input).await
    }

    pub async fn update(&self, id: CategoryId, input: &CategoryInput) -> Result<Category, ApiError> {
        input.validate()?;
        self.api.put(&format!("/categories/{}", id), input).await
    }

    pub async fn delete(&self, id: CategoryId) -> Result<(), ApiError> {
        self.api.delete(&format!("/categories/{}", id)).await
    }
}
