//! Console SMS delivery for development. Logs codes to tracing output.

use async_trait::async_trait;

use shikkha_application::{DeliveryReceipt, SmsVerificationService};
use shikkha_core::{AppError, AppResult};
use shikkha_domain::PhoneNumber;
use tracing::info;

/// Development delivery that logs one-time codes to the console.
#[derive(Clone)]
pub struct ConsoleSmsService;

impl ConsoleSmsService {
    /// Creates a new console SMS service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSmsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsVerificationService for ConsoleSmsService {
    async fn send_code(&self, phone: &PhoneNumber, code: &str) -> AppResult<DeliveryReceipt> {
        info!(
            to = phone.as_str(),
            "--- SMS (console) ---\nTo: {}\nYour login code is {}\n--- END SMS ---",
            phone.as_str(),
            code
        );

        Ok(DeliveryReceipt { provider_sid: None })
    }

    async fn check_code(
        &self,
        _phone: &PhoneNumber,
        _provider_sid: &str,
        _code: &str,
    ) -> AppResult<bool> {
        // Console deliveries never record a provider sid, so the engine
        // verifies locally and this path is unreachable.
        Err(AppError::Internal(
            "console sms delivery has no provider verification".to_owned(),
        ))
    }
}
