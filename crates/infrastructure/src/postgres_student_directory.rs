//! PostgreSQL-backed student directory: teacher resolution and rendering of
//! declarative visibility filters into SQL predicates.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use shikkha_application::StudentDirectoryRepository;
use shikkha_core::{AppError, AppResult, InstitutionId};
use shikkha_domain::{ClassId, StudentId, StudentVisibility, TeacherId};

/// PostgreSQL implementation of the student directory port.
#[derive(Clone)]
pub struct PostgresStudentDirectory {
    pool: PgPool,
}

impl PostgresStudentDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentDirectoryRepository for PostgresStudentDirectory {
    async fn find_teacher_by_subject(
        &self,
        institution_id: InstitutionId,
        subject: &str,
    ) -> AppResult<Option<TeacherId>> {
        let teacher_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM teachers
            WHERE institution_id = $1
              AND account_subject = $2
            LIMIT 1
            "#,
        )
        .bind(institution_id.as_uuid())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve teacher linkage: {error}"))
        })?;

        Ok(teacher_id.map(TeacherId::from_uuid))
    }

    async fn find_teacher_by_contact(
        &self,
        institution_id: InstitutionId,
        email: Option<&str>,
        phone_suffix: Option<&str>,
    ) -> AppResult<Option<TeacherId>> {
        let teacher_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM teachers
            WHERE institution_id = $1
              AND (($2::text IS NOT NULL AND LOWER(email) = LOWER($2))
                OR ($3::text IS NOT NULL AND phone LIKE '%' || $3))
            LIMIT 1
            "#,
        )
        .bind(institution_id.as_uuid())
        .bind(email)
        .bind(phone_suffix)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve teacher by contact: {error}"))
        })?;

        Ok(teacher_id.map(TeacherId::from_uuid))
    }

    async fn classes_led_by(
        &self,
        institution_id: InstitutionId,
        teacher_id: TeacherId,
    ) -> AppResult<Vec<ClassId>> {
        let class_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM classes
            WHERE institution_id = $1
              AND class_teacher_id = $2
            "#,
        )
        .bind(institution_id.as_uuid())
        .bind(teacher_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list led classes: {error}")))?;

        Ok(class_ids.into_iter().map(ClassId::from_uuid).collect())
    }

    async fn student_visible(
        &self,
        institution_id: InstitutionId,
        student_id: StudentId,
        visibility: &StudentVisibility,
    ) -> AppResult<bool> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM students s WHERE s.institution_id = ");
        builder.push_bind(institution_id.as_uuid());
        builder.push(" AND s.id = ");
        builder.push_bind(student_id.as_uuid());
        builder.push(" AND ");
        push_visibility_predicate(&mut builder, visibility);
        builder.push(")");

        builder
            .build_query_scalar::<bool>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to evaluate student visibility: {error}"))
            })
    }
}

/// Appends the SQL predicate for a visibility filter to a student query.
///
/// The query must alias the students table as `s`.
fn push_visibility_predicate(builder: &mut QueryBuilder<'_, Postgres>, filter: &StudentVisibility) {
    match filter {
        StudentVisibility::Unrestricted => {
            builder.push("TRUE");
        }
        StudentVisibility::ClassesLedBy(classes) if classes.is_empty() => {
            builder.push("FALSE");
        }
        StudentVisibility::ClassesLedBy(classes) => {
            let class_uuids: Vec<uuid::Uuid> =
                classes.iter().map(|class_id| class_id.as_uuid()).collect();
            builder.push("s.class_id = ANY(");
            builder.push_bind(class_uuids);
            builder.push(")");
        }
        StudentVisibility::ContactMatch {
            email,
            phone_suffix,
        } => {
            push_contact_predicate(builder, "s.email", "s.phone", email, phone_suffix);
        }
        StudentVisibility::GuardianContactMatch {
            email,
            phone_suffix,
        } => {
            builder.push(
                "EXISTS(SELECT 1 FROM guardians g WHERE g.institution_id = s.institution_id \
                 AND g.student_id = s.id AND ",
            );
            push_contact_predicate(builder, "g.email", "g.phone", email, phone_suffix);
            builder.push(")");
        }
        StudentVisibility::Nothing => {
            builder.push("FALSE");
        }
    }
}

fn push_contact_predicate(
    builder: &mut QueryBuilder<'_, Postgres>,
    email_column: &str,
    phone_column: &str,
    email: &Option<String>,
    phone_suffix: &Option<String>,
) {
    match (email, phone_suffix) {
        (Some(email), Some(suffix)) => {
            builder.push("(LOWER(");
            builder.push(email_column);
            builder.push(") = LOWER(");
            builder.push_bind(email.clone());
            builder.push(") OR ");
            builder.push(phone_column);
            builder.push(" LIKE ");
            builder.push_bind(format!("%{suffix}"));
            builder.push(")");
        }
        (Some(email), None) => {
            builder.push("LOWER(");
            builder.push(email_column);
            builder.push(") = LOWER(");
            builder.push_bind(email.clone());
            builder.push(")");
        }
        (None, Some(suffix)) => {
            builder.push(phone_column);
            builder.push(" LIKE ");
            builder.push_bind(format!("%{suffix}"));
        }
        // Filter constructors collapse the contactless case to Nothing.
        (None, None) => {
            builder.push("FALSE");
        }
    }
}

#[cfg(test)]
mod tests {
    use sqlx::{Postgres, QueryBuilder};

    use shikkha_domain::{ClassId, StudentVisibility};

    use super::push_visibility_predicate;

    fn rendered(filter: &StudentVisibility) -> String {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("");
        push_visibility_predicate(&mut builder, filter);
        builder.sql().to_owned()
    }

    #[test]
    fn unrestricted_renders_true() {
        assert_eq!(rendered(&StudentVisibility::Unrestricted), "TRUE");
    }

    #[test]
    fn nothing_renders_false() {
        assert_eq!(rendered(&StudentVisibility::Nothing), "FALSE");
    }

    #[test]
    fn empty_class_list_renders_false() {
        assert_eq!(rendered(&StudentVisibility::ClassesLedBy(Vec::new())), "FALSE");
    }

    #[test]
    fn class_filter_uses_any_binding() {
        let sql = rendered(&StudentVisibility::ClassesLedBy(vec![ClassId::new()]));
        assert!(sql.contains("s.class_id = ANY("));
    }

    #[test]
    fn contact_filter_matches_email_or_phone_suffix() {
        let sql = rendered(&StudentVisibility::ContactMatch {
            email: Some("student@example.com".to_owned()),
            phone_suffix: Some("1712345678".to_owned()),
        });
        assert!(sql.contains("LOWER(s.email)"));
        assert!(sql.contains("s.phone LIKE"));
    }

    #[test]
    fn guardian_filter_correlates_through_the_guardians_table() {
        let sql = rendered(&StudentVisibility::GuardianContactMatch {
            email: None,
            phone_suffix: Some("1712345678".to_owned()),
        });
        assert!(sql.contains("FROM guardians g"));
        assert!(sql.contains("g.student_id = s.id"));
        assert!(sql.contains("g.phone LIKE"));
    }
}
