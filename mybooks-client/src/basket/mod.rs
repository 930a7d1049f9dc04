//! Shopping basket: local, persisted on every change, mirrored to the
//! backend while a session exists.

pub mod cart;

pub use cart::{Basket, LineItem, Product};

use crate::api::{ApiClient, ApiRequest};
use crate::models::{Book, BookId, OrderLineRequest, PromoCode};
use crate::services::metrics;
use crate::services::{into_items, BookService, OrderService};
use crate::storage::{load_json, save_json, Storage, BASKET_KEY};
use mybooks_core::ApiError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Serialize)]
struct SavedBasket<'a> {
    items: &'a [OrderLineRequest],
}

pub struct BasketManager {
    basket: Mutex<Basket>,
    storage: Arc<dyn Storage>,
    api: ApiClient,
    books: BookService,
    orders: OrderService,
    initialized: AtomicBool,
    sync_generation: Arc<AtomicU64>,
}

impl BasketManager {
    pub fn new(api: ApiClient, storage: Arc<dyn Storage>) -> Self {
        Self {
            basket: Mutex::new(Basket::new()),
            storage,
            books: BookService::new(api.clone()),
            orders: OrderService::new(api.clone()),
            api,
            initialized: AtomicBool::new(false),
            sync_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Load the persisted basket and re-check its stock. Runs once.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let saved: Option<Vec<LineItem>> = match load_json(self.storage.as_ref(), BASKET_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable saved basket");
                if let Err(e) = self.storage.remove(BASKET_KEY) {
                    tracing::warn!(error = %e, "Failed to remove saved basket");
                }
                None
            }
        };

        if let Some(items) = saved {
            *self.lock() = Basket::from_items(items);
        }

        self.verify_stock().await;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Basket> {
        self.basket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy, persist the copy, then commit it. A failed
    /// write leaves the basket as it was.
    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Basket) -> Result<R, ApiError>,
    ) -> Result<(R, Basket), ApiError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let outcome = change(&mut next)?;

        if next != *guard {
            self.persist(&next)?;
            *guard = next.clone();
        }
        Ok((outcome, next))
    }

    fn persist(&self, basket: &Basket) -> Result<(), ApiError> {
        if basket.is_empty() {
            self.storage.remove(BASKET_KEY)
        } else {
            save_json(self.storage.as_ref(), BASKET_KEY, basket)
        }
    }

    pub async fn add_book(&self, book: &Book, quantity: u32) -> Result<u32, ApiError> {
        self.add_item(&Product::from(book), quantity).await
    }

    /// Add copies of a product; returns the line's quantity after capping.
    pub async fn add_item(&self, product: &Product, quantity: u32) -> Result<u32, ApiError> {
        let (quantity, snapshot) = self.mutate(|basket| basket.add(product, quantity))?;
        tracing::debug!(book_id = product.book_id, quantity, "Basket line added");
        self.schedule_sync(&snapshot);
        Ok(quantity)
    }

    /// Set an absolute quantity; zero removes the line. Returns false when
    /// the book was not in the basket.
    pub async fn update_quantity(&self, book_id: BookId, quantity: u32) -> Result<bool, ApiError> {
        let (found, snapshot) = self.mutate(|basket| Ok(basket.set_quantity(book_id, quantity)))?;
        if found {
            self.schedule_sync(&snapshot);
        }
        Ok(found)
    }

    pub async fn remove_item(&self, book_id: BookId) -> Result<bool, ApiError> {
        let (removed, snapshot) = self.mutate(|basket| Ok(basket.remove(book_id)))?;
        if removed {
            self.schedule_sync(&snapshot);
        }
        Ok(removed)
    }

    /// Empty the basket locally and, with a session, on the backend too.
    pub async fn clear(&self) -> Result<(), ApiError> {
        let (_, snapshot) = self.mutate(|basket| {
            basket.clear();
            Ok(())
        })?;
        self.storage.remove(BASKET_KEY)?;
        self.spawn_sync(snapshot.order_lines());
        Ok(())
    }

    /// Ask the backend for current stock and cap or drop lines accordingly.
    ///
    /// Returns true when the basket changed. Any failure leaves the basket
    /// untouched.
    pub async fn verify_stock(&self) -> bool {
        let ids: Vec<BookId> = self.lock().items().iter().map(|i| i.book_id).collect();
        if ids.is_empty() {
            return false;
        }

        let levels = match self.books.check_stock(&ids).await {
            Ok(levels) => levels,
            Err(e) => {
                tracing::warn!(kind = e.kind(), "Stock check failed, keeping basket as is: {}", e);
                return false;
            }
        };

        match self.mutate(|basket| Ok(basket.apply_stock(&levels))) {
            Ok((changed, _)) => {
                if changed {
                    tracing::info!("Basket adjusted to current stock");
                }
                changed
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist stock adjustments");
                false
            }
        }
    }

    /// Merge a server-side basket into the local one and persist the result.
    pub fn merge_server_basket(&self, server_items: &[LineItem]) -> Result<Basket, ApiError> {
        let (_, merged) = self.mutate(|basket| {
            basket.merge(server_items);
            Ok(())
        })?;
        Ok(merged)
    }

    /// Fetch the basket saved on the backend after login, merge it in, and
    /// push the merged result back.
    pub async fn load_saved_basket(&self) -> Result<(), ApiError> {
        if !self.api.session().is_authenticated() {
            return Ok(());
        }

        let value = self.api.send(ApiRequest::get("/user/basket")).await?;
        let server_items: Vec<LineItem> = into_items(value)?;
        tracing::debug!(lines = server_items.len(), "Loaded saved basket");

        self.merge_server_basket(&server_items)?;
        // Bare server lines carry no stock figure yet
        self.verify_stock().await;

        let merged = self.snapshot();
        if !merged.is_empty() {
            self.sync_now(&merged.order_lines()).await?;
        }
        Ok(())
    }

    pub async fn apply_promo_code(&self, code: &str) -> Result<PromoCode, ApiError> {
        self.orders.validate_promo_code(code).await
    }

    /// Upload the basket right away, superseding any pending background sync.
    pub async fn sync_now(&self, lines: &[OrderLineRequest]) -> Result<(), ApiError> {
        self.sync_generation.fetch_add(1, Ordering::SeqCst);
        upload(&self.api, lines).await
    }

    fn schedule_sync(&self, snapshot: &Basket) {
        // An empty basket is only pushed by an explicit clear
        if snapshot.is_empty() {
            return;
        }
        self.spawn_sync(snapshot.order_lines());
    }

    fn spawn_sync(&self, lines: Vec<OrderLineRequest>) {
        if !self.api.session().is_authenticated() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!("No async runtime, basket not synced");
                return;
            }
        };

        let generation = self.sync_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = self.sync_generation.clone();
        let api = self.api.clone();

        handle.spawn(async move {
            // A newer change has already scheduled its own upload
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = upload(&api, &lines).await {
                tracing::warn!(kind = e.kind(), "Basket sync failed: {}", e);
                metrics::record_basket_sync_failure();
            }
        });
    }

    pub fn snapshot(&self) -> Basket {
        self.lock().clone()
    }

    pub fn items(&self) -> Vec<LineItem> {
        self.lock().items().to_vec()
    }

    pub fn item_count(&self) -> u32 {
        self.lock().item_count()
    }

    pub fn total_price(&self) -> Decimal {
        self.lock().total_price()
    }

    pub fn is_in_basket(&self, book_id: BookId) -> bool {
        self.lock().contains(book_id)
    }

    pub fn quantity_of(&self, book_id: BookId) -> u32 {
        self.lock().quantity_of(book_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

async fn upload(api: &ApiClient, lines: &[OrderLineRequest]) -> Result<(), ApiError> {
    api.execute(ApiRequest::post("/user/basket").json(&SavedBasket { items: lines })?)
        .await
}
