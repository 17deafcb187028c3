//! PostgreSQL-backed account lookup for code issuance.

use async_trait::async_trait;
use sqlx::PgPool;

use shikkha_application::{AccountRecord, AccountRepository};
use shikkha_core::{AppError, AppResult, InstitutionId};
use shikkha_domain::{AccountStatus, LoginScope, PhoneNumber, UserId};

/// PostgreSQL implementation of the account repository port.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_phone_and_scope(
        &self,
        institution_id: InstitutionId,
        phone: &PhoneNumber,
        scope: LoginScope,
    ) -> AppResult<Option<AccountRecord>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, status
            FROM accounts
            WHERE institution_id = $1
              AND phone = $2
              AND scope = $3
            LIMIT 1
            "#,
        )
        .bind(institution_id.as_uuid())
        .bind(phone.as_str())
        .bind(scope.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up account: {error}")))?;

        row.map(AccountRecord::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: uuid::Uuid,
    status: String,
}

impl TryFrom<AccountRow> for AccountRecord {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from_uuid(row.id),
            status: AccountStatus::parse(&row.status)?,
        })
    }
}
