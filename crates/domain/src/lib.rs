//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod challenge;
mod identity;
mod phone;
mod scope;
mod visibility;

pub use challenge::{
    CHALLENGE_TTL_SECONDS, ChallengeId, ChallengeStatus, MAX_VERIFY_ATTEMPTS, OTP_CODE_LENGTH,
    OtpChallenge, RESEND_COOLDOWN_SECONDS,
};
pub use identity::{EmailAddress, UserId};
pub use phone::{PHONE_SUFFIX_LENGTH, PhoneNumber};
pub use scope::{AccountStatus, LoginScope, UserRole};
pub use visibility::{ClassId, StudentId, StudentVisibility, TeacherId, Viewer};
