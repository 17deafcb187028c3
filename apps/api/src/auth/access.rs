use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shikkha_core::AppError;
use shikkha_domain::{EmailAddress, PhoneNumber, StudentId, UserRole, Viewer};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAccessCheckRequest {
    pub institution: String,
    pub subject: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub student_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAccessCheckResponse {
    pub allowed: bool,
}

/// POST /access/students/check - Whether a caller may read one student record.
///
/// Consumed by the record-serving side of the platform, which authenticates
/// callers itself and forwards the resolved identity here.
pub async fn student_access_check_handler(
    State(state): State<AppState>,
    Json(payload): Json<StudentAccessCheckRequest>,
) -> ApiResult<Json<StudentAccessCheckResponse>> {
    let role = UserRole::from_str(&payload.role)?;

    let institution = state
        .institution_repository
        .find_by_slug(&payload.institution)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("institution '{}' not found", payload.institution))
        })?;

    let viewer = Viewer {
        subject: payload.subject,
        role,
        email: payload.email.as_deref().and_then(|raw| EmailAddress::new(raw).ok()),
        phone: payload.phone.as_deref().and_then(|raw| PhoneNumber::parse(raw).ok()),
        institution_id: institution.id,
    };

    let allowed = state
        .visibility_service
        .can_access_student(&viewer, StudentId::from_uuid(payload.student_id))
        .await?;

    Ok(Json(StudentAccessCheckResponse { allowed }))
}
