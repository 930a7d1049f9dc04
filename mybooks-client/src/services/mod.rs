pub mod activities;
pub mod auth;
pub mod authors;
pub mod books;
pub mod categories;
pub mod comments;
pub mod editors;
pub mod metrics;
pub mod newsletter;
pub mod orders;
pub mod series;
pub mod settings;
pub mod users;

pub use activities::ActivityService;
pub use auth::AuthService;
pub use authors::AuthorService;
pub use books::BookService;
pub use categories::CategoryService;
pub use comments::CommentService;
pub use editors::EditorService;
pub use newsletter::NewsletterService;
pub use orders::OrderService;
pub use series::SeriesService;
pub use settings::SettingsService;
pub use users::UserService;

use crate::api::ApiClient;
use crate::models::Page;
use mybooks_core::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// List views must keep rendering when the backend is down, so list
/// fetches fall back to an empty result instead of failing.
pub(crate) fn or_empty<T: Default>(result: Result<T, ApiError>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(kind = e.kind(), "Failed to load {}: {}", what, e);
            T::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged(Page<T>),
}

/// Some list endpoints answer with a bare array, others with a page.
pub(crate) fn into_page<T: DeserializeOwned>(value: Value) -> Result<Page<T>, ApiError> {
    if value.is_null() {
        return Ok(Page::empty());
    }

    Ok(match serde_json::from_value(value)? {
        Listing::Paged(page) => page,
        Listing::Plain(content) => Page {
            total_elements: content.len() as u64,
            size: content.len() as u32,
            content,
            total_pages: 1,
            number: 0,
        },
    })
}

pub(crate) fn into_items<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    into_page(value).map(|page| page.content)
}

/// Every service is a thin wrapper over the shared client.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub books: BookService,
    pub authors: AuthorService,
    pub editors: EditorService,
    pub categories: CategoryService,
    pub series: SeriesService,
    pub comments: CommentService,
    pub orders: OrderService,
    pub users: UserService,
    pub settings: SettingsService,
    pub newsletter: NewsletterService,
    pub activities: ActivityService,
}

impl Services {
    pub fn new(api: ApiClient) -> Self {
        Self {
            auth: AuthService::new(api.clone()),
            books: BookService::new(api.clone()),
            authors: AuthorService::new(api.clone()),
            editors: EditorService::new(api.clone()),
            categories: CategoryService::new(api.clone()),
            series: SeriesService::new(api.clone()),
            comments: CommentService::new(api.clone()),
            orders: OrderService::new(api.clone()),
            users: UserService::new(api.clone()),
            settings: SettingsService::new(api.clone()),
            newsletter: NewsletterService::new(api.clone()),
            activities: ActivityService::new(api),
        }
    }
}
