use chrono::{Duration, Utc};
use shikkha_core::{AppResult, InstitutionId};
use shikkha_domain::{
    CHALLENGE_TTL_SECONDS, ChallengeId, LoginScope, MAX_VERIFY_ATTEMPTS, PhoneNumber,
    RESEND_COOLDOWN_SECONDS, UserId,
};
use tracing::info;

use super::code_crypto;
use super::{NewChallenge, OtpService};

/// Inputs for issuing a one-time code.
#[derive(Debug, Clone)]
pub struct SendCodeParams {
    /// Institution partition.
    pub institution_id: InstitutionId,
    /// Canonical destination phone number.
    pub phone: PhoneNumber,
    /// Login scope the challenge is bound to.
    pub scope: LoginScope,
    /// Matching account, when one exists.
    pub user_id: Option<UserId>,
}

/// Result of an issuance request.
#[derive(Debug, Clone)]
pub struct CodeIssuance {
    /// The active challenge for this phone+scope.
    pub challenge_id: ChallengeId,
    /// Whether a new code was actually dispatched.
    pub sent: bool,
    /// Seconds until a replacement code may be requested.
    pub cooldown_seconds: i64,
    /// Plaintext code, surfaced only with development exposure enabled.
    pub dev_code: Option<String>,
}

impl OtpService {
    /// Issues a one-time code, or reports the cooldown on the active challenge.
    ///
    /// A second request inside the cooldown window returns the existing
    /// challenge id with `sent=false` instead of minting a new code. Outside
    /// the window a fresh challenge is created, the code dispatched, and the
    /// context-bound digest persisted only after delivery succeeded — the raw
    /// code is never durably stored.
    pub async fn request_code(&self, params: SendCodeParams) -> AppResult<CodeIssuance> {
        let now = Utc::now();

        if let Some(existing) = self
            .challenge_repository
            .find_active(params.institution_id, &params.phone, params.scope)
            .await?
            && existing.in_cooldown(now)
        {
            return Ok(CodeIssuance {
                challenge_id: existing.id,
                sent: false,
                cooldown_seconds: existing.cooldown_remaining_seconds(now),
                dev_code: None,
            });
        }

        let code = code_crypto::generate_code()?;

        let challenge = self
            .challenge_repository
            .insert(NewChallenge {
                id: ChallengeId::new(),
                institution_id: params.institution_id,
                phone: params.phone.clone(),
                scope: params.scope,
                user_id: params.user_id,
                max_attempts: MAX_VERIFY_ATTEMPTS,
                expires_at: now + Duration::seconds(CHALLENGE_TTL_SECONDS),
                resend_after: now + Duration::seconds(RESEND_COOLDOWN_SECONDS),
            })
            .await?;

        // Fail closed: a delivery error fails the whole issuance, leaving a
        // row whose empty digest can never verify.
        let receipt = self.delivery.send_code(&params.phone, &code).await?;

        let digest = code_crypto::code_digest(
            challenge.id,
            params.institution_id,
            &params.phone,
            params.scope,
            &code,
            self.code_secret.as_bytes(),
        )?;

        self.challenge_repository
            .store_code_digest(challenge.id, &digest, receipt.provider_sid.as_deref())
            .await?;

        info!(
            challenge_id = %challenge.id,
            institution_id = %params.institution_id,
            scope = params.scope.as_str(),
            provider_backed = receipt.provider_sid.is_some(),
            "issued OTP challenge"
        );

        Ok(CodeIssuance {
            challenge_id: challenge.id,
            sent: true,
            cooldown_seconds: RESEND_COOLDOWN_SECONDS,
            dev_code: self.expose_codes.then_some(code),
        })
    }
}
