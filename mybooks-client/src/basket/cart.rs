//! The basket as plain data. Every rule about quantities lives here; the
//! manager in the parent module only adds persistence and server sync.

use crate::models::{Book, BookId, OrderLineRequest, StockLevel};
use mybooks_core::ApiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the catalog knows about a book at the moment it is added.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub book_id: BookId,
    pub title: String,
    pub unit_price: Decimal,
    pub stock_quantity: u32,
}

impl From<&Book> for Product {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.id,
            title: book.title.clone(),
            unit_price: book.price,
            stock_quantity: book.stock,
        }
    }
}

/// One basket line. `quantity >= 1` always holds, and `quantity` never
/// exceeds `stock_quantity` when the stock is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "id", alias = "bookId")]
    pub book_id: BookId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "price", alias = "unitPrice", default)]
    pub unit_price: Decimal,
    /// `None` for lines that came back from the server as bare
    /// `{bookId, quantity}` pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    pub quantity: u32,
}

fn capped(quantity: u32, stock: Option<u32>) -> u32 {
    stock.map_or(quantity, |stock| quantity.min(stock))
}

impl LineItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    fn refresh_from(&mut self, product: &Product) {
        self.title = product.title.clone();
        self.unit_price = product.unit_price;
        self.stock_quantity = Some(product.stock_quantity);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Basket {
    items: Vec<LineItem>,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a basket from untrusted data (storage, server), dropping or
    /// capping lines that break the quantity invariant.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut basket = Basket::new();
        for mut item in items {
            item.quantity = capped(item.quantity, item.stock_quantity);
            if item.quantity == 0 || basket.contains(item.book_id) {
                continue;
            }
            basket.items.push(item);
        }
        basket
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, book_id: BookId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.book_id == book_id)
    }

    fn get_mut(&mut self, book_id: BookId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|i| i.book_id == book_id)
    }

    pub fn contains(&self, book_id: BookId) -> bool {
        self.get(book_id).is_some()
    }

    pub fn quantity_of(&self, book_id: BookId) -> u32 {
        self.get(book_id).map(|i| i.quantity).unwrap_or(0)
    }

    /// Total number of copies, not of lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// Add `quantity` copies, capped to stock. Returns the line's new
    /// quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<u32, ApiError> {
        if quantity == 0 {
            return Err(ApiError::invalid(
                "quantity",
                "zero_quantity",
                "Quantity must be at least 1",
            ));
        }
        if product.stock_quantity == 0 {
            return Err(ApiError::invalid(
                "quantity",
                "out_of_stock",
                format!("\"{}\" is out of stock", product.title),
            ));
        }

        if let Some(item) = self.get_mut(product.book_id) {
            item.refresh_from(product);
            item.quantity = capped(item.quantity.saturating_add(quantity), item.stock_quantity);
            return Ok(item.quantity);
        }

        let quantity = quantity.min(product.stock_quantity);
        self.items.push(LineItem {
            book_id: product.book_id,
            title: product.title.clone(),
            unit_price: product.unit_price,
            stock_quantity: Some(product.stock_quantity),
            quantity,
        });
        Ok(quantity)
    }

    /// Set an absolute quantity, capped to stock; zero removes the line.
    /// Returns false when the book is not in the basket.
    pub fn set_quantity(&mut self, book_id: BookId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(book_id);
        }
        match self.get_mut(book_id) {
            Some(item) => {
                item.quantity = capped(quantity, item.stock_quantity);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, book_id: BookId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.book_id != book_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply fresh stock figures. Lines whose stock dropped to zero go away.
    /// Returns true when any quantity changed or a line was removed.
    pub fn apply_stock(&mut self, levels: &[StockLevel]) -> bool {
        let mut changed = false;
        for level in levels {
            if let Some(item) = self.get_mut(level.id) {
                item.stock_quantity = Some(level.stock_quantity);
                if item.quantity > level.stock_quantity {
                    item.quantity = level.stock_quantity;
                    changed = true;
                }
            }
        }

        let before = self.items.len();
        self.items.retain(|i| i.stock_quantity != Some(0));
        changed || self.items.len() != before
    }

    /// Fold the server's saved basket into this one.
    ///
    /// Per book the larger quantity wins, capped to the best known stock
    /// figure (the server's when it sent one). Books present on one side
    /// only are kept, including server lines without a stock figure.
    /// Merging the same server basket twice changes nothing the second time.
    pub fn merge(&mut self, server: &[LineItem]) {
        for remote in server {
            if remote.quantity == 0 || remote.stock_quantity == Some(0) {
                continue;
            }

            match self.get_mut(remote.book_id) {
                Some(local) => {
                    if remote.stock_quantity.is_some() {
                        local.stock_quantity = remote.stock_quantity;
                    }
                    local.quantity = capped(local.quantity.max(remote.quantity), local.stock_quantity);
                    if local.title.is_empty() {
                        local.title = remote.title.clone();
                    }
                }
                None => {
                    let mut item = remote.clone();
                    item.quantity = capped(item.quantity, item.stock_quantity);
                    self.items.push(item);
                }
            }
        }
    }

    /// Body lines for the server-side basket and order creation.
    pub fn order_lines(&self) -> Vec<OrderLineRequest> {
        self.items
            .iter()
            .map(|i| OrderLineRequest {
                book_id: i.book_id,
                quantity: i.quantity,
            })
            .collect()
    }
}
