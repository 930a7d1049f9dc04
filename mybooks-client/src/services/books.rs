use super::{into_items, into_page, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{AuthorId, Book, BookId, BookInput, CategoryId, Page, PageRequest, StockLevel};
use mybooks_core::ApiError;
use serde::Serialize;
use serde_json::json;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl From<PageRequest> for BookQuery {
    fn from(page: PageRequest) -> Self {
        Self {
            page: page.page,
            size: page.size,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct BookService {
    api: ApiClient,
}

impl BookService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, query: &BookQuery) -> Page<Book> {
        let result = self.page_of(ApiRequest::get("/books").params(query)).await;
        or_empty(result, "books")
    }

    pub async fn get(&self, id: BookId) -> Result<Book, ApiError> {
        self.api.get(&format!("/books/{}", id)).await
    }

    pub async fn by_category(&self, category_id: CategoryId, page: PageRequest) -> Page<Book> {
        let result = self
            .page_of(ApiRequest::get(format!("/books/category/{}", category_id)).params(&page))
            .await;
        or_empty(result, "books of category")
    }

    pub async fn by_author(&self, author_id: AuthorId) -> Page<Book> {
        let result = self
            .page_of(Ok(ApiRequest::get(format!("/books/author/{}", author_id))))
            .await;
        or_empty(result, "books of author")
    }

    pub async fn search_by_title(&self, title: &str, page: PageRequest) -> Page<Book> {
        let title = title.trim();
        if title.is_empty() {
            return Page::empty();
        }
        let result = self
            .page_of(
                ApiRequest::get("/books/search/title")
                    .param("title", title)
                    .params(&page),
            )
            .await;
        or_empty(result, "search results")
    }

    pub async fn popular(&self, limit: u32) -> Vec<Book> {
        self.ranked("/books/popular", limit).await
    }

    pub async fn new_releases(&self, limit: u32) -> Vec<Book> {
        self.ranked("/books/new-releases", limit).await
    }

    pub async fn recommendations(&self, limit: u32) -> Vec<Book> {
        self.ranked("/books/recommendations", limit).await
    }

    pub async fn similar(&self, id: BookId, limit: u32) -> Vec<Book> {
        self.ranked(&format!("/books/{}/similar", id), limit).await
    }

    async fn ranked(&self, path: &str, limit: u32) -> Vec<Book> {
        let result = self.items_of(ApiRequest::get(path).param("limit", limit)).await;
        or_empty(result, path)
    }

    async fn items_of(&self, request: ApiRequest) -> Result<Vec<Book>, ApiError> {
        let value = self.api.send(request).await?;
        into_items(value)
    }

    async fn page_of(&self, request: Result<ApiRequest, ApiError>) -> Result<Page<Book>, ApiError> {
        let value = self.api.send(request?).await?;
        into_page(value)
    }

    pub async fn create(&self, input: &BookInput) -> Result<Book, ApiError> {
        input.validate()?;
        let book: Book = self.api.post("/books", input).await?;
        tracing::info!(book_id = book.id, "Book created");
        Ok(book)
    }

    pub async fn update(&self, id: BookId, input: &BookInput) -> Result<Book, ApiError> {
        input.validate()?;
        self.api.put(&format!("/books/{}", id), input).await
    }

    pub async fn delete(&self, id: BookId) -> Result<(), ApiError> {
        self.api.delete(&format!("/books/{}", id)).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn update_stock(&self, id: BookId, quantity: u32) -> Result<Book, ApiError> {
        self.api
            .patch(&format!("/books/{}/stock", id), &json!({ "quantity": quantity }))
            .await
    }

    /// Authoritative stock for the given books. Unknown ids are simply
    /// absent from the answer.
    pub async fn check_stock(&self, ids: &[BookId]) -> Result<Vec<StockLevel>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let value = self
            .api
            .send(ApiRequest::post("/books/check-stock").with_body(json!({ "bookIds": ids })))
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FixtureBackend;
    use crate::session::SessionContext;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn service() -> BookService {
        let session = SessionContext::new(Arc::new(MemoryStorage::new()));
        BookService::new(ApiClient::new(Arc::new(FixtureBackend::new()), session))
    }

    #[tokio::test]
    async fn list_pages_through_catalog() {
        let books = service();
        let page = books.list(&BookQuery::from(PageRequest::new(0, 5))).await;
        assert_eq!(page.content.len(), 5);
        assert_eq!(page.total_elements, 20);
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let result = service().get(999).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn unsupported_listing_degrades_to_empty() {
        // The fixture has no ranking endpoint
        assert!(service().popular(5).await.is_empty());
    }

    #[tokio::test]
    async fn blank_search_skips_the_request() {
        assert!(service()
            .search_by_title("   ", PageRequest::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn stock_writes_require_a_session() {
        let result = service().update_stock(1, 3).await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }
}
