use crate::api::ApiClient;
use crate::models::{EmailSettings, GeneralSettings, Settings, ShippingSettings};
use mybooks_core::ApiError;
use validator::Validate;

/// Store-wide settings, edited section by section.
#[derive(Clone)]
pub struct SettingsService {
    api: ApiClient,
}

impl SettingsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get(&self) -> Result<Settings, ApiError> {
        self.api.get("/settings").await
    }

    pub async fn update_general(&self, general: &GeneralSettings) -> Result<GeneralSettings, ApiError> {
        general.validate()?;
        self.api.put("/settings/general", general).await
    }

    pub async fn update_shipping(&self, shipping: &ShippingSettings) -> Result<ShippingSettings, ApiError> {
        self.api.put("/settings/shipping", shipping).await
    }

    pub async fn update_email(&self, email: &EmailSettings) -> Result<EmailSettings, ApiError> {
        email.validate()?;
        self.api.put("/settings/email", email).await
    }
}
