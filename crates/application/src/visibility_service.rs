//! Role-scoped student-record visibility resolution.
//!
//! Student and parent accounts are frequently provisioned before (or
//! independently of) their directory entries, so strict foreign-key linkage
//! cannot be assumed. Teacher resolution therefore runs in two explicit
//! steps: exact account linkage first, then a case-insensitive email /
//! phone-suffix match against the teacher directory.

use std::sync::Arc;

use async_trait::async_trait;

use shikkha_core::{AppResult, InstitutionId};
use shikkha_domain::{
    ClassId, EmailAddress, PhoneNumber, StudentId, StudentVisibility, TeacherId, UserRole, Viewer,
};

#[cfg(test)]
mod tests;

/// Repository port for directory lookups and filter evaluation.
#[async_trait]
pub trait StudentDirectoryRepository: Send + Sync {
    /// Finds the teacher record linked to an account subject.
    async fn find_teacher_by_subject(
        &self,
        institution_id: InstitutionId,
        subject: &str,
    ) -> AppResult<Option<TeacherId>>;

    /// Finds a teacher record by contact fallback.
    ///
    /// Email matches case-insensitively; phones match on the trailing-digit
    /// suffix. Implementations receive at least one of the two.
    async fn find_teacher_by_contact(
        &self,
        institution_id: InstitutionId,
        email: Option<&str>,
        phone_suffix: Option<&str>,
    ) -> AppResult<Option<TeacherId>>;

    /// Lists the classes where the teacher is the assigned class teacher.
    async fn classes_led_by(
        &self,
        institution_id: InstitutionId,
        teacher_id: TeacherId,
    ) -> AppResult<Vec<ClassId>>;

    /// Whether a specific student is matched by the given filter.
    async fn student_visible(
        &self,
        institution_id: InstitutionId,
        student_id: StudentId,
        visibility: &StudentVisibility,
    ) -> AppResult<bool>;
}

/// Application service computing student-record visibility for a viewer.
#[derive(Clone)]
pub struct VisibilityService {
    directory: Arc<dyn StudentDirectoryRepository>,
}

impl VisibilityService {
    /// Creates a new visibility service.
    #[must_use]
    pub fn new(directory: Arc<dyn StudentDirectoryRepository>) -> Self {
        Self { directory }
    }

    /// Computes the declarative filter restricting student queries for a viewer.
    pub async fn student_visibility(&self, viewer: &Viewer) -> AppResult<StudentVisibility> {
        if viewer.role.is_privileged() {
            return Ok(StudentVisibility::Unrestricted);
        }

        match viewer.role {
            UserRole::Teacher => self.teacher_visibility(viewer).await,
            UserRole::Student => Ok(StudentVisibility::contact_match(
                viewer.email.as_ref(),
                viewer.phone.as_ref(),
            )),
            UserRole::Parent => Ok(StudentVisibility::guardian_contact_match(
                viewer.email.as_ref(),
                viewer.phone.as_ref(),
            )),
            // Privileged roles returned above; anything else sees nothing.
            _ => Ok(StudentVisibility::Nothing),
        }
    }

    /// Whether the viewer may access one specific student record.
    pub async fn can_access_student(
        &self,
        viewer: &Viewer,
        student_id: StudentId,
    ) -> AppResult<bool> {
        let visibility = self.student_visibility(viewer).await?;
        if visibility.matches_nothing() {
            return Ok(false);
        }

        self.directory
            .student_visible(viewer.institution_id, student_id, &visibility)
            .await
    }

    async fn teacher_visibility(&self, viewer: &Viewer) -> AppResult<StudentVisibility> {
        let Some(teacher_id) = self.resolve_teacher(viewer).await? else {
            return Ok(StudentVisibility::Nothing);
        };

        let classes = self
            .directory
            .classes_led_by(viewer.institution_id, teacher_id)
            .await?;

        if classes.is_empty() {
            return Ok(StudentVisibility::Nothing);
        }

        Ok(StudentVisibility::ClassesLedBy(classes))
    }

    async fn resolve_teacher(&self, viewer: &Viewer) -> AppResult<Option<TeacherId>> {
        if let Some(teacher_id) = self
            .directory
            .find_teacher_by_subject(viewer.institution_id, viewer.subject.as_str())
            .await?
        {
            return Ok(Some(teacher_id));
        }

        let email = viewer.email.as_ref().map(EmailAddress::as_str);
        let phone_suffix = viewer.phone.as_ref().and_then(PhoneNumber::suffix);

        if email.is_none() && phone_suffix.is_none() {
            return Ok(None);
        }

        self.directory
            .find_teacher_by_contact(viewer.institution_id, email, phone_suffix)
            .await
    }
}
