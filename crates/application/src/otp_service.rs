//! Phone OTP challenge engine.
//!
//! Challenges are single-use, time-limited, attempt-capped, and stored only
//! as context-bound digests. Issuance enforces a resend cooldown per
//! (institution, phone, scope) so an attacker cannot SMS-bomb a number, and
//! verification compares digests in constant time.
//!
//! The delivery strategy (external verification provider vs local digest
//! with console delivery) is fixed at construction; the engine itself never
//! re-inspects provider configuration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shikkha_core::{AppResult, InstitutionId};
use shikkha_domain::{ChallengeId, LoginScope, OtpChallenge, PhoneNumber, UserId};

mod code_crypto;
mod create;
mod verify;


pub use create::{CodeIssuance, SendCodeParams};
pub use verify::{VerifiedChallenge, VerifyCodeParams, VerifyOutcome, VerifyRejection};

/// Insert payload for a freshly issued challenge.
///
/// Carries no code material: the digest is persisted separately once
/// delivery has succeeded, so a failed send never leaves a verifiable row.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    /// Challenge identifier, generated by the caller.
    pub id: ChallengeId,
    /// Institution partition.
    pub institution_id: InstitutionId,
    /// Canonical destination phone number.
    pub phone: PhoneNumber,
    /// Login scope the challenge is bound to.
    pub scope: LoginScope,
    /// Matching account, when one existed at send time.
    pub user_id: Option<UserId>,
    /// Attempt cap.
    pub max_attempts: i32,
    /// Absolute expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Earliest instant a replacement code may be issued.
    pub resend_after: DateTime<Utc>,
}

/// Repository port for challenge persistence.
///
/// `record_failed_attempt` and `consume` must be atomic relative to
/// concurrent verifications of the same challenge: implementations use
/// single conditional statements, never read-modify-write.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Finds the unconsumed, unexpired challenge for a phone+scope, if any.
    async fn find_active(
        &self,
        institution_id: InstitutionId,
        phone: &PhoneNumber,
        scope: LoginScope,
    ) -> AppResult<Option<OtpChallenge>>;

    /// Loads a challenge by id, bound to its full issuance context.
    async fn find_for_verification(
        &self,
        id: ChallengeId,
        institution_id: InstitutionId,
        phone: &PhoneNumber,
        scope: LoginScope,
    ) -> AppResult<Option<OtpChallenge>>;

    /// Inserts a new challenge row with an empty digest placeholder.
    async fn insert(&self, challenge: NewChallenge) -> AppResult<OtpChallenge>;

    /// Replaces the digest placeholder after delivery succeeded.
    async fn store_code_digest(
        &self,
        id: ChallengeId,
        code_digest: &str,
        provider_sid: Option<&str>,
    ) -> AppResult<()>;

    /// Atomically increments the attempt counter, bounded by the cap.
    ///
    /// Returns the attempt count after the operation.
    async fn record_failed_attempt(&self, id: ChallengeId) -> AppResult<i32>;

    /// Atomically marks the challenge consumed.
    ///
    /// Returns `false` when another verification won the race.
    async fn consume(&self, id: ChallengeId) -> AppResult<bool>;
}

/// Outcome of dispatching a code to its destination.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Correlation id when an external provider handled the code.
    pub provider_sid: Option<String>,
}

/// Port for SMS code delivery and provider-backed verification.
#[async_trait]
pub trait SmsVerificationService: Send + Sync {
    /// Dispatches a one-time code to the phone. Failures fail the issuance.
    async fn send_code(&self, phone: &PhoneNumber, code: &str) -> AppResult<DeliveryReceipt>;

    /// Checks a submitted code against the provider's verification record.
    ///
    /// Only called for challenges that carry a provider correlation id.
    async fn check_code(
        &self,
        phone: &PhoneNumber,
        provider_sid: &str,
        code: &str,
    ) -> AppResult<bool>;
}

/// Application service orchestrating challenge issuance and verification.
#[derive(Clone)]
pub struct OtpService {
    challenge_repository: Arc<dyn ChallengeRepository>,
    delivery: Arc<dyn SmsVerificationService>,
    code_secret: String,
    expose_codes: bool,
}

impl OtpService {
    /// Creates a new OTP service.
    ///
    /// `expose_codes` surfaces the plaintext code in issuance results for
    /// local development; it must be `false` in production deployments.
    #[must_use]
    pub fn new(
        challenge_repository: Arc<dyn ChallengeRepository>,
        delivery: Arc<dyn SmsVerificationService>,
        code_secret: String,
        expose_codes: bool,
    ) -> Self {
        Self {
            challenge_repository,
            delivery,
            code_secret,
            expose_codes,
        }
    }
}
