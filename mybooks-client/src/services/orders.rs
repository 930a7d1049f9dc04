use super::{into_page, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{
    NewOrder, Order, OrderId, OrderQuery, OrderStats, OrderStatus, Page, PageRequest, PromoCode,
    UserId, UserStats,
};
use mybooks_core::ApiError;
use serde_json::json;
use validator::Validate;

#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every order, for the back-office list.
    pub async fn list(&self, query: &OrderQuery) -> Page<Order> {
        let result = self.page_of(ApiRequest::get("/orders").params(query)).await;
        or_empty(result, "orders")
    }

    pub async fn for_user(&self, user_id: UserId, page: PageRequest) -> Page<Order> {
        let result = self
            .page_of(ApiRequest::get(format!("/orders/user/{}", user_id)).params(&page))
            .await;
        or_empty(result, "user orders")
    }

    async fn page_of(&self, request: Result<ApiRequest, ApiError>) -> Result<Page<Order>, ApiError> {
        let value = self.api.send(request?).await?;
        into_page(value)
    }

    pub async fn get(&self, id: OrderId) -> Result<Order, ApiError> {
        self.api.get(&format!("/orders/{}", id)).await
    }

    pub async fn create(&self, order: &NewOrder) -> Result<Order, ApiError> {
        order.validate()?;
        if let Some(address) = &order.shipping_address {
            address.validate()?;
        }

        let created: Order = self.api.post("/orders", order).await?;
        tracing::info!(
            order_id = created.id,
            lines = created.items.len(),
            "Order placed"
        );
        Ok(created)
    }

    pub async fn cancel(&self, id: OrderId) -> Result<Order, ApiError> {
        self.api.fetch(ApiRequest::put(format!("/orders/{}/cancel", id))).await
    }

    /// Ask the backend to validate a promo code. An unknown or expired code
    /// is a validation failure, not a transport one.
    pub async fn validate_promo_code(&self, code: &str) -> Result<PromoCode, ApiError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::invalid("code", "required", "Promo code is required"));
        }

        let result: Result<PromoCode, ApiError> = self
            .api
            .post("/promo-codes/validate", &json!({ "code": code }))
            .await;

        match result {
            Ok(promo) if promo.valid => Ok(promo),
            Ok(_) => Err(invalid_promo()),
            Err(ApiError::BadRequest(_)) | Err(ApiError::NotFound(_)) => Err(invalid_promo()),
            Err(e) => Err(e),
        }
    }

    pub async fn reorder(&self, id: OrderId) -> Result<Order, ApiError> {
        self.api.fetch(ApiRequest::post(format!("/orders/{}/reorder", id))).await
    }

    pub async fn track(&self, order_number: &str) -> Result<Order, ApiError> {
        self.api
            .get(&format!("/orders/track/{}", order_number.trim()))
            .await
    }

    pub async fn stats(&self) -> Result<OrderStats, ApiError> {
        self.api.get("/admin/orders/stats").await
    }

    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, ApiError> {
        self.api
            .put(&format!("/admin/orders/{}/status", id), &json!({ "status": status }))
            .await
    }

    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats, ApiError> {
        self.api.get(&format!("/orders/user/{}/stats", user_id)).await
    }
}

fn invalid_promo() -> ApiError {
    ApiError::invalid("code", "invalid_promo_code", "Code promo invalide")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FixtureBackend;
    use crate::session::SessionContext;
    use crate::storage::MemoryStorage;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn service() -> OrderService {
        let session = SessionContext::new(Arc::new(MemoryStorage::new()));
        OrderService::new(ApiClient::new(Arc::new(FixtureBackend::new()), session))
    }

    #[tokio::test]
    async fn known_promo_code_is_accepted() {
        let promo = service().validate_promo_code(" welcome10 ").await.unwrap();
        assert_eq!(promo.discount_percent, Some(Decimal::TEN));
    }

    #[tokio::test]
    async fn unknown_promo_code_is_a_validation_error() {
        let result = service().validate_promo_code("NOPE").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_order_is_rejected_locally() {
        let result = service()
            .create(&NewOrder {
                items: vec![],
                promo_code: None,
                shipping_address: None,
            })
            .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
