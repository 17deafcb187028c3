use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shikkha_core::{AppError, AppResult, InstitutionId};
use shikkha_domain::{
    ClassId, EmailAddress, PhoneNumber, StudentId, StudentVisibility, TeacherId, UserRole, Viewer,
};

use super::{StudentDirectoryRepository, VisibilityService};

#[derive(Default)]
struct TestDirectory {
    teacher_for_subject: Option<TeacherId>,
    teacher_for_contact: Option<TeacherId>,
    classes: Vec<ClassId>,
    visible_student: Option<StudentId>,
    evaluations: Mutex<Vec<StudentVisibility>>,
}

#[async_trait]
impl StudentDirectoryRepository for TestDirectory {
    async fn find_teacher_by_subject(
        &self,
        _institution_id: InstitutionId,
        _subject: &str,
    ) -> AppResult<Option<TeacherId>> {
        Ok(self.teacher_for_subject)
    }

    async fn find_teacher_by_contact(
        &self,
        _institution_id: InstitutionId,
        _email: Option<&str>,
        _phone_suffix: Option<&str>,
    ) -> AppResult<Option<TeacherId>> {
        Ok(self.teacher_for_contact)
    }

    async fn classes_led_by(
        &self,
        _institution_id: InstitutionId,
        _teacher_id: TeacherId,
    ) -> AppResult<Vec<ClassId>> {
        Ok(self.classes.clone())
    }

    async fn student_visible(
        &self,
        _institution_id: InstitutionId,
        student_id: StudentId,
        visibility: &StudentVisibility,
    ) -> AppResult<bool> {
        self.evaluations
            .lock()
            .map_err(|error| {
                AppError::Internal(format!("failed to lock directory state: {error}"))
            })?
            .push(visibility.clone());
        Ok(self.visible_student == Some(student_id))
    }
}

impl TestDirectory {
    fn evaluation_count(&self) -> usize {
        self.evaluations
            .lock()
            .ok()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }
}

fn viewer(role: UserRole) -> Viewer {
    Viewer {
        subject: "account-subject-1".to_owned(),
        role,
        email: EmailAddress::new("viewer@example.com").ok(),
        phone: PhoneNumber::parse("01712345678").ok(),
        institution_id: InstitutionId::new(),
    }
}

fn contactless_viewer(role: UserRole) -> Viewer {
    Viewer {
        subject: "account-subject-1".to_owned(),
        role,
        email: None,
        phone: None,
        institution_id: InstitutionId::new(),
    }
}

#[tokio::test]
async fn privileged_roles_see_everything() {
    let service = VisibilityService::new(Arc::new(TestDirectory::default()));

    for role in [
        UserRole::SuperAdmin,
        UserRole::Admin,
        UserRole::Principal,
        UserRole::Staff,
    ] {
        let visibility = service.student_visibility(&viewer(role)).await;
        assert!(matches!(visibility, Ok(StudentVisibility::Unrestricted)));
    }
}

#[tokio::test]
async fn linked_teacher_sees_led_classes() {
    let teacher_id = TeacherId::new();
    let classes = vec![ClassId::new(), ClassId::new()];
    let directory = TestDirectory {
        teacher_for_subject: Some(teacher_id),
        classes: classes.clone(),
        ..TestDirectory::default()
    };
    let service = VisibilityService::new(Arc::new(directory));

    let visibility = service.student_visibility(&viewer(UserRole::Teacher)).await;
    assert_eq!(visibility.ok(), Some(StudentVisibility::ClassesLedBy(classes)));
}

#[tokio::test]
async fn unlinked_teacher_falls_back_to_contact_match() {
    let teacher_id = TeacherId::new();
    let classes = vec![ClassId::new()];
    let directory = TestDirectory {
        teacher_for_subject: None,
        teacher_for_contact: Some(teacher_id),
        classes: classes.clone(),
        ..TestDirectory::default()
    };
    let service = VisibilityService::new(Arc::new(directory));

    let visibility = service.student_visibility(&viewer(UserRole::Teacher)).await;
    assert_eq!(visibility.ok(), Some(StudentVisibility::ClassesLedBy(classes)));
}

#[tokio::test]
async fn teacher_with_no_classes_sees_nothing() {
    let directory = TestDirectory {
        teacher_for_subject: Some(TeacherId::new()),
        classes: Vec::new(),
        ..TestDirectory::default()
    };
    let service = VisibilityService::new(Arc::new(directory));

    let visibility = service.student_visibility(&viewer(UserRole::Teacher)).await;
    assert_eq!(visibility.ok(), Some(StudentVisibility::Nothing));
}

#[tokio::test]
async fn unresolvable_teacher_sees_nothing() {
    let service = VisibilityService::new(Arc::new(TestDirectory::default()));

    let visibility = service.student_visibility(&viewer(UserRole::Teacher)).await;
    assert_eq!(visibility.ok(), Some(StudentVisibility::Nothing));
}

#[tokio::test]
async fn contactless_teacher_skips_the_fallback_lookup() {
    let directory = TestDirectory {
        teacher_for_contact: Some(TeacherId::new()),
        classes: vec![ClassId::new()],
        ..TestDirectory::default()
    };
    let service = VisibilityService::new(Arc::new(directory));

    let visibility = service
        .student_visibility(&contactless_viewer(UserRole::Teacher))
        .await;
    assert_eq!(visibility.ok(), Some(StudentVisibility::Nothing));
}

#[tokio::test]
async fn student_matches_own_contact() {
    let service = VisibilityService::new(Arc::new(TestDirectory::default()));

    let visibility = service.student_visibility(&viewer(UserRole::Student)).await;
    assert_eq!(
        visibility.ok(),
        Some(StudentVisibility::ContactMatch {
            email: Some("viewer@example.com".to_owned()),
            phone_suffix: Some("1712345678".to_owned()),
        })
    );
}

#[tokio::test]
async fn parent_matches_through_guardian_contact() {
    let service = VisibilityService::new(Arc::new(TestDirectory::default()));

    let visibility = service.student_visibility(&viewer(UserRole::Parent)).await;
    assert_eq!(
        visibility.ok(),
        Some(StudentVisibility::GuardianContactMatch {
            email: Some("viewer@example.com".to_owned()),
            phone_suffix: Some("1712345678".to_owned()),
        })
    );
}

#[tokio::test]
async fn contactless_student_sees_nothing() {
    let service = VisibilityService::new(Arc::new(TestDirectory::default()));

    let visibility = service
        .student_visibility(&contactless_viewer(UserRole::Student))
        .await;
    assert_eq!(visibility.ok(), Some(StudentVisibility::Nothing));
}

#[tokio::test]
async fn access_check_applies_the_filter() {
    let student_id = StudentId::new();
    let directory = Arc::new(TestDirectory {
        visible_student: Some(student_id),
        ..TestDirectory::default()
    });
    let service = VisibilityService::new(directory.clone());

    let allowed = service
        .can_access_student(&viewer(UserRole::Student), student_id)
        .await;
    assert_eq!(allowed.ok(), Some(true));

    let denied = service
        .can_access_student(&viewer(UserRole::Student), StudentId::new())
        .await;
    assert_eq!(denied.ok(), Some(false));
}

#[tokio::test]
async fn empty_filters_never_reach_the_directory() {
    let directory = Arc::new(TestDirectory {
        visible_student: Some(StudentId::new()),
        ..TestDirectory::default()
    });
    let service = VisibilityService::new(directory.clone());

    let allowed = service
        .can_access_student(&contactless_viewer(UserRole::Student), StudentId::new())
        .await;

    assert_eq!(allowed.ok(), Some(false));
    assert_eq!(directory.evaluation_count(), 0);
}
