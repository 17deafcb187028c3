use chrono::Utc;
use shikkha_core::{AppResult, InstitutionId};
use shikkha_domain::{ChallengeId, ChallengeStatus, LoginScope, PhoneNumber, UserId};
use tracing::{info, warn};

use super::code_crypto;
use super::OtpService;

/// Inputs for verifying a submitted code.
#[derive(Debug, Clone)]
pub struct VerifyCodeParams {
    /// Challenge the submission targets.
    pub challenge_id: ChallengeId,
    /// Institution partition.
    pub institution_id: InstitutionId,
    /// Canonical phone number the challenge was issued for.
    pub phone: PhoneNumber,
    /// Login scope the challenge was issued for.
    pub scope: LoginScope,
    /// The submitted code.
    pub code: String,
}

/// Why a submission was rejected.
///
/// Rejections are data, not errors: every variant maps to a distinct
/// user-facing response, and callers must not learn from `NotFound` whether
/// an account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyRejection {
    /// No challenge matches the id and issuance context.
    NotFound,
    /// The challenge was already consumed.
    AlreadyUsed,
    /// The challenge expired before the submission.
    Expired,
    /// The attempt cap was reached; the challenge is locked.
    AttemptsExhausted,
    /// The submitted code does not match.
    InvalidCode,
}

impl VerifyRejection {
    /// Returns the stable reason string for logs and response bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyUsed => "already_used",
            Self::Expired => "expired",
            Self::AttemptsExhausted => "max_attempts",
            Self::InvalidCode => "invalid_code",
        }
    }
}

/// A successfully consumed challenge.
#[derive(Debug, Clone)]
pub struct VerifiedChallenge {
    /// The consumed challenge.
    pub challenge_id: ChallengeId,
    /// Account resolved at send time, when one existed.
    pub user_id: Option<UserId>,
}

/// Outcome of a verification request.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// The code matched; the challenge is now consumed.
    Verified(VerifiedChallenge),
    /// The submission was rejected.
    Rejected(VerifyRejection),
}

impl OtpService {
    /// Verifies a submitted code against its challenge.
    ///
    /// Checks short-circuit in a fixed order: existence, prior consumption,
    /// expiry, attempt cap, then the code itself. Mismatches increment the
    /// attempt counter atomically; a match consumes the challenge atomically,
    /// and losing that race reports the challenge as already used.
    pub async fn verify_code(&self, params: VerifyCodeParams) -> AppResult<VerifyOutcome> {
        let now = Utc::now();

        let Some(challenge) = self
            .challenge_repository
            .find_for_verification(
                params.challenge_id,
                params.institution_id,
                &params.phone,
                params.scope,
            )
            .await?
        else {
            return Ok(VerifyOutcome::Rejected(VerifyRejection::NotFound));
        };

        match challenge.status(now) {
            ChallengeStatus::Consumed => {
                return Ok(VerifyOutcome::Rejected(VerifyRejection::AlreadyUsed));
            }
            ChallengeStatus::Expired => {
                return Ok(VerifyOutcome::Rejected(VerifyRejection::Expired));
            }
            ChallengeStatus::Locked => {
                return Ok(VerifyOutcome::Rejected(VerifyRejection::AttemptsExhausted));
            }
            ChallengeStatus::Pending => {}
        }

        let code_matches = match challenge.provider_sid.as_deref() {
            Some(provider_sid) => {
                self.delivery
                    .check_code(&challenge.phone, provider_sid, &params.code)
                    .await?
            }
            None => {
                let submitted = code_crypto::code_digest(
                    challenge.id,
                    challenge.institution_id,
                    &challenge.phone,
                    challenge.scope,
                    &params.code,
                    self.code_secret.as_bytes(),
                )?;
                code_crypto::digests_match(&submitted, &challenge.code_hash)
            }
        };

        if !code_matches {
            let attempts = self
                .challenge_repository
                .record_failed_attempt(challenge.id)
                .await?;
            warn!(
                challenge_id = %challenge.id,
                attempts,
                max_attempts = challenge.max_attempts,
                "rejected OTP submission"
            );
            return Ok(VerifyOutcome::Rejected(VerifyRejection::InvalidCode));
        }

        if !self.challenge_repository.consume(challenge.id).await? {
            return Ok(VerifyOutcome::Rejected(VerifyRejection::AlreadyUsed));
        }

        info!(challenge_id = %challenge.id, "OTP challenge consumed");

        Ok(VerifyOutcome::Verified(VerifiedChallenge {
            challenge_id: challenge.id,
            user_id: challenge.user_id,
        }))
    }
}
