//! OTP challenge entity and lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shikkha_core::InstitutionId;
use uuid::Uuid;

use crate::{LoginScope, PhoneNumber, UserId};

/// Number of digits in a one-time code.
pub const OTP_CODE_LENGTH: usize = 6;

/// Wrong-code submissions allowed before a challenge locks.
pub const MAX_VERIFY_ATTEMPTS: i32 = 5;

/// Seconds a challenge stays verifiable after issuance.
pub const CHALLENGE_TTL_SECONDS: i64 = 5 * 60;

/// Seconds before a new code may be issued for the same phone+scope.
pub const RESEND_COOLDOWN_SECONDS: i64 = 45;

/// Unique identifier for an OTP challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId(Uuid);

impl ChallengeId {
    /// Creates a new random challenge identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a challenge identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChallengeId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle state of a challenge, derived from its row at an observed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    /// Created and awaiting verification.
    Pending,
    /// Successfully verified; terminal.
    Consumed,
    /// Past its expiry timestamp; terminal.
    Expired,
    /// Attempt cap reached; terminal.
    Locked,
}

/// One OTP issuance-and-verification attempt record.
///
/// The persisted row is the single source of truth for all state; no copy of
/// a challenge is ever cached in process memory.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    /// Challenge identifier.
    pub id: ChallengeId,
    /// Institution the challenge belongs to.
    pub institution_id: InstitutionId,
    /// Canonical phone number the code was sent to.
    pub phone: PhoneNumber,
    /// Login scope the challenge is bound to.
    pub scope: LoginScope,
    /// Matching account, when one existed at send time.
    pub user_id: Option<UserId>,
    /// Context-bound digest of the code; empty until delivery succeeds.
    pub code_hash: String,
    /// Failed verification attempts so far.
    pub attempts: i32,
    /// Attempt cap for this challenge.
    pub max_attempts: i32,
    /// Absolute expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Earliest instant a replacement code may be issued.
    pub resend_after: DateTime<Utc>,
    /// Set exactly once on successful verification.
    pub consumed_at: Option<DateTime<Utc>>,
    /// Correlation id from the external SMS verification provider.
    pub provider_sid: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Derives the lifecycle state at the observed instant.
    ///
    /// Consumption wins over expiry: a consumed challenge reports
    /// [`ChallengeStatus::Consumed`] even after its expiry passes, so repeat
    /// submissions keep getting "already used" rather than "expired".
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> ChallengeStatus {
        if self.consumed_at.is_some() {
            return ChallengeStatus::Consumed;
        }
        if self.expires_at <= now {
            return ChallengeStatus::Expired;
        }
        if self.attempts >= self.max_attempts {
            return ChallengeStatus::Locked;
        }
        ChallengeStatus::Pending
    }

    /// Whether a replacement code is still blocked by the cooldown window.
    #[must_use]
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.resend_after > now
    }

    /// Seconds remaining in the cooldown window, zero once elapsed.
    #[must_use]
    pub fn cooldown_remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.resend_after - now).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use shikkha_core::InstitutionId;

    use super::{
        ChallengeId, ChallengeStatus, MAX_VERIFY_ATTEMPTS, OtpChallenge, RESEND_COOLDOWN_SECONDS,
    };
    use crate::{LoginScope, PhoneNumber};

    fn challenge() -> OtpChallenge {
        let now = Utc::now();
        OtpChallenge {
            id: ChallengeId::new(),
            institution_id: InstitutionId::new(),
            phone: PhoneNumber::parse("01712345678").unwrap_or_else(|_| panic!("test phone")),
            scope: LoginScope::Student,
            user_id: None,
            code_hash: String::new(),
            attempts: 0,
            max_attempts: MAX_VERIFY_ATTEMPTS,
            expires_at: now + Duration::minutes(5),
            resend_after: now + Duration::seconds(RESEND_COOLDOWN_SECONDS),
            consumed_at: None,
            provider_sid: None,
            created_at: now,
        }
    }

    #[test]
    fn fresh_challenge_is_pending_and_cooling_down() {
        let now = Utc::now();
        let challenge = challenge();
        assert_eq!(challenge.status(now), ChallengeStatus::Pending);
        assert!(challenge.in_cooldown(now));
        assert!(challenge.cooldown_remaining_seconds(now) <= RESEND_COOLDOWN_SECONDS);
    }

    #[test]
    fn expiry_is_observed_time_based() {
        let challenge = challenge();
        let later = challenge.expires_at + Duration::seconds(1);
        assert_eq!(challenge.status(later), ChallengeStatus::Expired);
    }

    #[test]
    fn attempt_cap_locks_the_challenge() {
        let mut challenge = challenge();
        challenge.attempts = challenge.max_attempts;
        assert_eq!(challenge.status(Utc::now()), ChallengeStatus::Locked);
    }

    #[test]
    fn consumption_is_terminal_even_after_expiry() {
        let mut challenge = challenge();
        challenge.consumed_at = Some(Utc::now());
        let later = challenge.expires_at + Duration::minutes(10);
        assert_eq!(challenge.status(later), ChallengeStatus::Consumed);
    }

    #[test]
    fn cooldown_elapses_to_zero() {
        let challenge = challenge();
        let later = challenge.resend_after + Duration::seconds(1);
        assert!(!challenge.in_cooldown(later));
        assert_eq!(challenge.cooldown_remaining_seconds(later), 0);
    }
}
