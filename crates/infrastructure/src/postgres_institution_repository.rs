//! PostgreSQL-backed institution lookup.

use async_trait::async_trait;
use sqlx::PgPool;

use shikkha_application::{Institution, InstitutionRepository};
use shikkha_core::{AppError, AppResult, InstitutionId};

/// PostgreSQL implementation of the institution repository port.
#[derive(Clone)]
pub struct PostgresInstitutionRepository {
    pool: PgPool,
}

impl PostgresInstitutionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstitutionRepository for PostgresInstitutionRepository {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Institution>> {
        let row = sqlx::query_as::<_, InstitutionRow>(
            r#"
            SELECT id, slug, name, active
            FROM institutions
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve institution: {error}")))?;

        Ok(row.map(Institution::from))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InstitutionRow {
    id: uuid::Uuid,
    slug: String,
    name: String,
    active: bool,
}

impl From<InstitutionRow> for Institution {
    fn from(row: InstitutionRow) -> Self {
        Self {
            id: InstitutionId::from_uuid(row.id),
            slug: row.slug,
            name: row.name,
            active: row.active,
        }
    }
}
