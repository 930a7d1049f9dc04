use super::{into_items, or_empty};
use crate::api::{ApiClient, ApiRequest};
use crate::models::{Activity, DashboardStats, NewActivity, UserId};
use mybooks_core::ApiError;

/// Audit trail and dashboard figures for the back-office.
#[derive(Clone)]
pub struct ActivityService {
    api: ApiClient,
}

impl ActivityService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn recent(&self, limit: u32) -> Vec<Activity> {
        let request = ApiRequest::get("/activities/recent").param("limit", limit);
        or_empty(self.items(request).await, "recent activities")
    }

    pub async fn for_user(&self, user_id: UserId, limit: u32) -> Vec<Activity> {
        let request = ApiRequest::get(format!("/activities/user/{}", user_id)).param("limit", limit);
        or_empty(self.items(request).await, "user activities")
    }

    async fn items(&self, request: ApiRequest) -> Result<Vec<Activity>, ApiError> {
        let value = self.api.send(request).await?;
        into_items(value)
    }

    pub async fn log(&self, activity: &NewActivity) -> Result<Activity, ApiError> {
        self.api.post("/activities", activity).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.api.get("/dashboard/stats").await
    }
}
