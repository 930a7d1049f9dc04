//! Client library for the MyBooks online bookstore.
pub mod api;
pub mod basket;
pub mod config;
pub mod models;
pub mod notifications;
pub mod router;
pub mod services;
pub mod session;
pub mod startup;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiRequest, Backend, FixtureBackend, HttpBackend};
pub use basket::BasketManager;
pub use mybooks_core::ApiError;
pub use session::{Session, SessionContext, SessionEvent};
pub use startup::MyBooks;
