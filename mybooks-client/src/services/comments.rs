use super::{into_items, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{BookId, Comment, NewComment};
use mybooks_core::ApiError;
use validator::Validate;

#[derive(Clone)]
pub struct CommentService {
    api: ApiClient,
}

impl CommentService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn for_book(&self, book_id: BookId) -> Vec<Comment> {
        or_empty(self.fetch_for_book(book_id).await, "comments")
    }

    async fn fetch_for_book(&self, book_id: BookId) -> Result<Vec<Comment>, ApiError> {
        let value = self
            .api
            .send(ApiRequest::get(format!("/books/{}/comments", book_id)))
            .await?;
        into_items(value)
    }

    /// Posting requires a session; the backend attributes the comment.
    pub async fn create(&self, comment: &NewComment) -> Result<Comment, ApiError> {
        comment.validate()?;
        self.api.post("/comments", comment).await
    }
}
