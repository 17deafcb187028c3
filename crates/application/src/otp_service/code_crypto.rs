use hmac::{Hmac, Mac};
use sha2::Sha256;
use shikkha_core::{AppError, AppResult, InstitutionId};
use shikkha_domain::{ChallengeId, LoginScope, OTP_CODE_LENGTH, PhoneNumber};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generates a uniformly random zero-padded numeric code.
///
/// Rejection sampling avoids the modulo bias a bare `u32 % 1_000_000` would
/// introduce; the source is the operating system CSPRNG.
pub(super) fn generate_code() -> AppResult<String> {
    const RANGE: u32 = 10u32.pow(OTP_CODE_LENGTH as u32);
    const LIMIT: u32 = u32::MAX - (u32::MAX % RANGE);

    loop {
        let mut bytes = [0u8; 4];
        getrandom::fill(&mut bytes).map_err(|error| {
            AppError::Internal(format!("failed to generate one-time code: {error}"))
        })?;

        let value = u32::from_be_bytes(bytes);
        if value < LIMIT {
            return Ok(format!(
                "{:0width$}",
                value % RANGE,
                width = OTP_CODE_LENGTH
            ));
        }
    }
}

/// Computes the context-bound digest stored in place of the code.
///
/// HMAC-SHA256 keyed by the server secret over the challenge id, tenant,
/// phone, scope, and code, newline-delimited: a digest leaked from one
/// challenge cannot be replayed against another, and none can be produced
/// without the secret.
pub(super) fn code_digest(
    challenge_id: ChallengeId,
    institution_id: InstitutionId,
    phone: &PhoneNumber,
    scope: LoginScope,
    code: &str,
    secret: &[u8],
) -> AppResult<String> {
    use std::fmt::Write;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|error| AppError::Internal(format!("invalid code digest secret: {error}")))?;

    let challenge = challenge_id.to_string();
    let institution = institution_id.to_string();
    for part in [
        challenge.as_str(),
        institution.as_str(),
        phone.as_str(),
        scope.as_str(),
        code,
    ] {
        mac.update(part.as_bytes());
        mac.update(b"\n");
    }

    let digest = mac.finalize().into_bytes();
    Ok(digest
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        }))
}

/// Constant-time digest comparison.
///
/// An empty stored digest (delivery never completed) matches nothing.
pub(super) fn digests_match(submitted: &str, stored: &str) -> bool {
    if stored.is_empty() || submitted.len() != stored.len() {
        return false;
    }
    submitted.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use shikkha_core::InstitutionId;
    use shikkha_domain::{ChallengeId, LoginScope, OTP_CODE_LENGTH, PhoneNumber};

    use super::{code_digest, digests_match, generate_code};

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("01712345678").unwrap_or_else(|_| panic!("test phone"))
    }

    #[test]
    fn generated_codes_are_zero_padded_digits() {
        for _ in 0..32 {
            let code = generate_code().unwrap_or_default();
            assert_eq!(code.len(), OTP_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn digest_is_deterministic_for_same_context() {
        let challenge_id = ChallengeId::new();
        let institution_id = InstitutionId::new();
        let first = code_digest(
            challenge_id,
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"server-secret",
        );
        let second = code_digest(
            challenge_id,
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"server-secret",
        );
        assert_eq!(first.ok(), second.ok());
    }

    #[test]
    fn digest_changes_with_challenge_context() {
        let institution_id = InstitutionId::new();
        let first = code_digest(
            ChallengeId::new(),
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"server-secret",
        )
        .unwrap_or_default();
        let second = code_digest(
            ChallengeId::new(),
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"server-secret",
        )
        .unwrap_or_default();
        assert_ne!(first, second);
    }

    #[test]
    fn digest_changes_with_scope() {
        let challenge_id = ChallengeId::new();
        let institution_id = InstitutionId::new();
        let student = code_digest(
            challenge_id,
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"server-secret",
        )
        .unwrap_or_default();
        let parent = code_digest(
            challenge_id,
            institution_id,
            &phone(),
            LoginScope::Parent,
            "123456",
            b"server-secret",
        )
        .unwrap_or_default();
        assert_ne!(student, parent);
    }

    #[test]
    fn digest_requires_the_secret() {
        let challenge_id = ChallengeId::new();
        let institution_id = InstitutionId::new();
        let real = code_digest(
            challenge_id,
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"server-secret",
        )
        .unwrap_or_default();
        let forged = code_digest(
            challenge_id,
            institution_id,
            &phone(),
            LoginScope::Student,
            "123456",
            b"guessed-secret",
        )
        .unwrap_or_default();
        assert_ne!(real, forged);
    }

    #[test]
    fn empty_stored_digest_never_matches() {
        assert!(!digests_match("", ""));
        assert!(!digests_match("abcd", ""));
    }

    #[test]
    fn matching_digests_compare_equal() {
        assert!(digests_match("abcd1234", "abcd1234"));
        assert!(!digests_match("abcd1234", "abcd1235"));
    }
}
