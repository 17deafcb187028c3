//! Twilio Verify-backed SMS code delivery and verification.
//!
//! The platform supplies its own codes (the engine binds them into stored
//! digests), so verifications are created with Twilio's custom-code option
//! and checked against the provider's record. All calls carry a request
//! timeout; a hung provider must not hold the login request open.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use shikkha_application::{DeliveryReceipt, SmsVerificationService};
use shikkha_core::{AppError, AppResult};
use shikkha_domain::PhoneNumber;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and service binding for Twilio Verify.
#[derive(Debug, Clone)]
pub struct TwilioVerifyConfig {
    /// Account SID.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// Verify service SID the verifications are created under.
    pub verify_service_sid: String,
}

/// Twilio Verify implementation of the SMS verification port.
#[derive(Clone)]
pub struct TwilioVerifyService {
    http_client: reqwest::Client,
    config: TwilioVerifyConfig,
}

impl TwilioVerifyService {
    /// Creates a provider client with a bounded request timeout.
    pub fn new(config: TwilioVerifyConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build sms provider client: {error}"))
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "https://verify.twilio.com/v2/Services/{}/{resource}",
            self.config.verify_service_sid
        )
    }
}

#[async_trait]
impl SmsVerificationService for TwilioVerifyService {
    async fn send_code(&self, phone: &PhoneNumber, code: &str) -> AppResult<DeliveryReceipt> {
        let response = self
            .http_client
            .post(self.endpoint("Verifications"))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", phone.as_str()),
                ("Channel", "sms"),
                ("CustomCode", code),
            ])
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("sms provider unreachable: {error}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "sms provider rejected verification create: {}",
                response.status()
            )));
        }

        let verification: VerificationResource = response.json().await.map_err(|error| {
            AppError::Internal(format!("invalid sms provider response: {error}"))
        })?;

        Ok(DeliveryReceipt {
            provider_sid: Some(verification.sid),
        })
    }

    async fn check_code(
        &self,
        phone: &PhoneNumber,
        _provider_sid: &str,
        code: &str,
    ) -> AppResult<bool> {
        let response = self
            .http_client
            .post(self.endpoint("VerificationCheck"))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", phone.as_str()), ("Code", code)])
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("sms provider unreachable: {error}")))?;

        // 404 means no pending verification exists for this number; the
        // submission cannot be approved, which is a mismatch, not a fault.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "sms provider rejected verification check: {}",
                response.status()
            )));
        }

        let check: VerificationCheckResource = response.json().await.map_err(|error| {
            AppError::Internal(format!("invalid sms provider response: {error}"))
        })?;

        Ok(check.status == "approved")
    }
}

#[derive(Debug, Deserialize)]
struct VerificationResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct VerificationCheckResource {
    status: String,
}
