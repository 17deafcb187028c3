//! Application services and ports.

#![forbid(unsafe_code)]

mod institution;
mod otp_service;
mod rate_limit_service;
mod visibility_service;

pub use institution::{AccountRecord, AccountRepository, Institution, InstitutionRepository};
pub use otp_service::{
    ChallengeRepository, CodeIssuance, DeliveryReceipt, NewChallenge, OtpService, SendCodeParams,
    SmsVerificationService, VerifiedChallenge, VerifyCodeParams, VerifyOutcome, VerifyRejection,
};
pub use rate_limit_service::{AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService};
pub use visibility_service::{StudentDirectoryRepository, VisibilityService};
