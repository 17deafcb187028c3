use shikkha_application::RateLimitRule;

mod access;
mod otp;
mod request_context;

pub use access::student_access_check_handler;
pub use otp::{send_otp_handler, verify_otp_handler};

pub(super) const OTP_SEND_RATE_RULE: (i32, i64) = (5, 15 * 60);
pub(super) const OTP_VERIFY_RATE_RULE: (i32, i64) = (15, 15 * 60);

pub(crate) fn otp_send_rate_rule() -> RateLimitRule {
    RateLimitRule::new("otp_send", OTP_SEND_RATE_RULE.0, OTP_SEND_RATE_RULE.1)
}

pub(crate) fn otp_verify_rate_rule() -> RateLimitRule {
    RateLimitRule::new("otp_verify", OTP_VERIFY_RATE_RULE.0, OTP_VERIFY_RATE_RULE.1)
}
