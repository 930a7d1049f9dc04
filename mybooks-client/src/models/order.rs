use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::catalog::BookId;

pub type OrderId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Orders can only be cancelled before they leave the warehouse.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub book_id: BookId,
    #[serde(default)]
    pub title: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    pub status: OrderStatus,
    #[serde(alias = "totalAmount")]
    pub total: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub book_id: BookId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Zip code is required"))]
    pub zip_code: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[validate(length(min = 1, message = "Order has no items"))]
    pub items: Vec<OrderLineRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub page: u32,
    pub size: u32,
    /// Field and direction, e.g. `date,desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl OrderQuery {
    pub fn first_page() -> Self {
        Self {
            page: 0,
            size: 10,
            ..Default::default()
        }
    }
}

/// Admin-wide order figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderStats {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub pending_orders: u64,
    pub cancelled_orders: u64,
}

/// Per-customer figures shown on the account dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub total_orders: u64,
    pub wishlist_items: u64,
    pub total_books: u64,
    pub total_spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub code: String,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

impl PromoCode {
    /// Price after discount, never below zero.
    pub fn apply_to(&self, total: Decimal) -> Decimal {
        let mut discounted = total;
        if let Some(percent) = self.discount_percent {
            discounted -= total * percent / Decimal::ONE_HUNDRED;
        }
        if let Some(amount) = self.discount_amount {
            discounted -= amount;
        }
        discounted.max(Decimal::ZERO).round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_does_not_break_decoding() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 1,
            "status": "ON_HOLD",
            "totalAmount": 30.0
        }))
        .unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
        assert!(!order.status.is_cancellable());
    }

    #[test]
    fn promo_code_discounts_are_floored_at_zero() {
        let promo = PromoCode {
            code: "WELCOME10".into(),
            discount_percent: Some(Decimal::new(10, 0)),
            discount_amount: None,
            valid: true,
        };
        assert_eq!(promo.apply_to(Decimal::new(5000, 2)), Decimal::new(4500, 2));

        let flat = PromoCode {
            code: "BIG".into(),
            discount_percent: None,
            discount_amount: Some(Decimal::new(100, 0)),
            valid: true,
        };
        assert_eq!(flat.apply_to(Decimal::new(20, 0)), Decimal::ZERO);
    }

    #[test]
    fn order_query_skips_unset_filters() {
        let query = serde_json::to_value(OrderQuery {
            status: Some(OrderStatus::Shipped),
            ..OrderQuery::first_page()
        })
        .unwrap();
        assert_eq!(
            query,
            serde_json::json!({ "page": 0, "size": 10, "status": "SHIPPED" })
        );
    }

    #[test]
    fn order_request_reads_back_from_the_wire() {
        let order: NewOrder = serde_json::from_value(serde_json::json!({
            "items": [{ "bookId": 2, "quantity": 3 }],
            "promoCode": "WELCOME10"
        }))
        .unwrap();
        assert_eq!(order.items, vec![OrderLineRequest { book_id: 2, quantity: 3 }]);
        assert_eq!(order.promo_code.as_deref(), Some("WELCOME10"));
        assert!(order.shipping_address.is_none());
    }
}
