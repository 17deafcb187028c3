//! PostgreSQL-backed OTP challenge repository using the `otp_challenges` table.
//!
//! Attempt increments and consumption are single conditional UPDATE
//! statements so concurrent verifications of one challenge serialize at the
//! row without read-modify-write races.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shikkha_application::{ChallengeRepository, NewChallenge};
use shikkha_core::{AppError, AppResult, InstitutionId};
use shikkha_domain::{ChallengeId, LoginScope, OtpChallenge, PhoneNumber, UserId};

/// PostgreSQL implementation of the challenge repository port.
#[derive(Clone)]
pub struct PostgresChallengeRepository {
    pool: PgPool,
}

impl PostgresChallengeRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CHALLENGE_COLUMNS: &str = "id, institution_id, phone, scope, user_id, code_hash, \
     attempts, max_attempts, expires_at, resend_after, consumed_at, provider_sid, created_at";

#[async_trait]
impl ChallengeRepository for PostgresChallengeRepository {
    async fn find_active(
        &self,
        institution_id: InstitutionId,
        phone: &PhoneNumber,
        scope: LoginScope,
    ) -> AppResult<Option<OtpChallenge>> {
        let row = sqlx::query_as::<_, ChallengeRow>(&format!(
            r#"
            SELECT {CHALLENGE_COLUMNS}
            FROM otp_challenges
            WHERE institution_id = $1
              AND phone = $2
              AND scope = $3
              AND consumed_at IS NULL
              AND expires_at > now()
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(institution_id.as_uuid())
        .bind(phone.as_str())
        .bind(scope.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find active challenge: {error}")))?;

        row.map(OtpChallenge::try_from).transpose()
    }

    async fn find_for_verification(
        &self,
        id: ChallengeId,
        institution_id: InstitutionId,
        phone: &PhoneNumber,
        scope: LoginScope,
    ) -> AppResult<Option<OtpChallenge>> {
        let row = sqlx::query_as::<_, ChallengeRow>(&format!(
            r#"
            SELECT {CHALLENGE_COLUMNS}
            FROM otp_challenges
            WHERE id = $1
              AND institution_id = $2
              AND phone = $3
              AND scope = $4
            "#
        ))
        .bind(id.as_uuid())
        .bind(institution_id.as_uuid())
        .bind(phone.as_str())
        .bind(scope.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load challenge: {error}")))?;

        row.map(OtpChallenge::try_from).transpose()
    }

    async fn insert(&self, challenge: NewChallenge) -> AppResult<OtpChallenge> {
        let row = sqlx::query_as::<_, ChallengeRow>(&format!(
            r#"
            INSERT INTO otp_challenges
                (id, institution_id, phone, scope, user_id, code_hash,
                 attempts, max_attempts, expires_at, resend_after)
            VALUES ($1, $2, $3, $4, $5, '', 0, $6, $7, $8)
            RETURNING {CHALLENGE_COLUMNS}
            "#
        ))
        .bind(challenge.id.as_uuid())
        .bind(challenge.institution_id.as_uuid())
        .bind(challenge.phone.as_str())
        .bind(challenge.scope.as_str())
        .bind(challenge.user_id.map(|user_id| user_id.as_uuid()))
        .bind(challenge.max_attempts)
        .bind(challenge.expires_at)
        .bind(challenge.resend_after)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert challenge: {error}")))?;

        OtpChallenge::try_from(row)
    }

    async fn store_code_digest(
        &self,
        id: ChallengeId,
        code_digest: &str,
        provider_sid: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE otp_challenges
            SET code_hash = $2, provider_sid = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(code_digest)
        .bind(provider_sid)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store code digest: {error}")))?;

        Ok(())
    }

    async fn record_failed_attempt(&self, id: ChallengeId) -> AppResult<i32> {
        // Bounded atomic increment. No row means the counter already sits at
        // the cap (or the challenge vanished); report the stored value.
        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE otp_challenges
            SET attempts = attempts + 1
            WHERE id = $1
              AND attempts < max_attempts
            RETURNING attempts
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record attempt: {error}")))?;

        if let Some(attempts) = attempts {
            return Ok(attempts);
        }

        let stored = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT attempts
            FROM otp_challenges
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read attempt count: {error}")))?;

        Ok(stored.unwrap_or(0))
    }

    async fn consume(&self, id: ChallengeId) -> AppResult<bool> {
        let consumed = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            UPDATE otp_challenges
            SET consumed_at = now()
            WHERE id = $1
              AND consumed_at IS NULL
            RETURNING id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to consume challenge: {error}")))?;

        Ok(consumed.is_some())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChallengeRow {
    id: uuid::Uuid,
    institution_id: uuid::Uuid,
    phone: String,
    scope: String,
    user_id: Option<uuid::Uuid>,
    code_hash: String,
    attempts: i32,
    max_attempts: i32,
    expires_at: DateTime<Utc>,
    resend_after: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
    provider_sid: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChallengeRow> for OtpChallenge {
    type Error = AppError;

    fn try_from(row: ChallengeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ChallengeId::from_uuid(row.id),
            institution_id: InstitutionId::from_uuid(row.institution_id),
            phone: PhoneNumber::parse(&row.phone)?,
            scope: LoginScope::from_str(&row.scope)?,
            user_id: row.user_id.map(UserId::from_uuid),
            code_hash: row.code_hash,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            expires_at: row.expires_at,
            resend_after: row.resend_after,
            consumed_at: row.consumed_at,
            provider_sid: row.provider_sid,
            created_at: row.created_at,
        })
    }
}
