use std::sync::Arc;

use shikkha_application::{
    AccountRepository, InstitutionRepository, OtpService, RateLimitService, VisibilityService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub otp_service: OtpService,
    pub rate_limit_service: RateLimitService,
    pub visibility_service: VisibilityService,
    pub institution_repository: Arc<dyn InstitutionRepository>,
    pub account_repository: Arc<dyn AccountRepository>,
}
