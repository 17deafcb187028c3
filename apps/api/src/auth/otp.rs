use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shikkha_application::{
    Institution, RateLimitService, SendCodeParams, VerifyCodeParams, VerifyOutcome,
    VerifyRejection,
};
use shikkha_core::AppError;
use shikkha_domain::{
    AccountStatus, ChallengeId, LoginScope, PhoneNumber, RESEND_COOLDOWN_SECONDS,
};

use crate::error::ApiResult;
use crate::state::AppState;

use super::request_context::client_ip;
use super::{otp_send_rate_rule, otp_verify_rate_rule};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSendRequest {
    pub institution: String,
    pub scope: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSendResponse {
    pub challenge_id: Option<Uuid>,
    pub sent: bool,
    pub cooldown_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_otp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyRequest {
    pub institution: String,
    pub scope: String,
    pub phone: String,
    pub challenge_id: Uuid,
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyResponse {
    pub verified: bool,
    pub challenge_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRejectionResponse {
    pub verified: bool,
    pub reason: &'static str,
    pub message: &'static str,
}

/// POST /auth/otp/send - Issue a one-time login code.
pub async fn send_otp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OtpSendRequest>,
) -> ApiResult<Response> {
    let scope = LoginScope::from_str(&payload.scope)?;
    let phone = PhoneNumber::parse(&payload.phone)?;
    let institution = resolve_institution(&state, &payload.institution).await?;

    let throttle_key = RateLimitService::throttle_key(
        client_ip(&headers).as_deref(),
        &institution.slug,
        scope,
        phone.as_str(),
    );
    state
        .rate_limit_service
        .check_rate_limit(&otp_send_rate_rule(), &throttle_key)
        .await?;

    let account = state
        .account_repository
        .find_by_phone_and_scope(institution.id, &phone, scope)
        .await?;

    let Some(account) = account else {
        // Anti-enumeration: shape-identical success without a challenge, so
        // probing cannot learn whether a phone holds an account.
        return Ok(Json(OtpSendResponse {
            challenge_id: None,
            sent: true,
            cooldown_seconds: RESEND_COOLDOWN_SECONDS,
            dev_otp: None,
        })
        .into_response());
    };

    match account.status {
        AccountStatus::Active => {}
        AccountStatus::Pending => {
            return Err(AppError::Forbidden("account is awaiting approval".to_owned()).into());
        }
        AccountStatus::Inactive => {
            return Err(AppError::Forbidden("account is inactive".to_owned()).into());
        }
        AccountStatus::Rejected => {
            return Err(
                AppError::Forbidden("account application was rejected".to_owned()).into(),
            );
        }
    }

    let issuance = state
        .otp_service
        .request_code(SendCodeParams {
            institution_id: institution.id,
            phone,
            scope,
            user_id: Some(account.user_id),
        })
        .await?;

    let status = if issuance.sent {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };

    let body = OtpSendResponse {
        challenge_id: Some(issuance.challenge_id.as_uuid()),
        sent: issuance.sent,
        cooldown_seconds: issuance.cooldown_seconds,
        dev_otp: issuance.dev_code,
    };

    Ok((status, Json(body)).into_response())
}

/// POST /auth/otp/verify - Verify a submitted code.
pub async fn verify_otp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OtpVerifyRequest>,
) -> ApiResult<Response> {
    let scope = LoginScope::from_str(&payload.scope)?;
    let phone = PhoneNumber::parse(&payload.phone)?;
    let institution = resolve_institution(&state, &payload.institution).await?;

    let throttle_key = RateLimitService::throttle_key(
        client_ip(&headers).as_deref(),
        &institution.slug,
        scope,
        phone.as_str(),
    );
    state
        .rate_limit_service
        .check_rate_limit(&otp_verify_rate_rule(), &throttle_key)
        .await?;

    let outcome = state
        .otp_service
        .verify_code(VerifyCodeParams {
            challenge_id: ChallengeId::from_uuid(payload.challenge_id),
            institution_id: institution.id,
            phone,
            scope,
            code: payload.code,
        })
        .await?;

    Ok(verification_response(outcome))
}

async fn resolve_institution(state: &AppState, slug: &str) -> ApiResult<Institution> {
    let institution = state
        .institution_repository
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("institution '{slug}' not found")))?;

    if !institution.active {
        return Err(AppError::Forbidden("institution is not active".to_owned()).into());
    }

    Ok(institution)
}

fn verification_response(outcome: VerifyOutcome) -> Response {
    match outcome {
        VerifyOutcome::Verified(verified) => Json(OtpVerifyResponse {
            verified: true,
            challenge_id: verified.challenge_id.as_uuid(),
            user_id: verified.user_id.map(|user_id| user_id.as_uuid()),
        })
        .into_response(),
        VerifyOutcome::Rejected(rejection) => rejection_response(rejection),
    }
}

fn rejection_response(rejection: VerifyRejection) -> Response {
    let (status, reason, message) = match rejection {
        // NotFound deliberately shares the invalid-code response so callers
        // cannot distinguish a wrong code from a nonexistent challenge.
        VerifyRejection::NotFound | VerifyRejection::InvalidCode => (
            StatusCode::BAD_REQUEST,
            "invalid_code",
            "the code is invalid",
        ),
        VerifyRejection::AlreadyUsed => (
            StatusCode::BAD_REQUEST,
            "already_used",
            "this code was already used",
        ),
        VerifyRejection::Expired => (
            StatusCode::GONE,
            "expired",
            "this code has expired, request a new one",
        ),
        VerifyRejection::AttemptsExhausted => (
            StatusCode::TOO_MANY_REQUESTS,
            "max_attempts",
            "too many attempts, request a new code",
        ),
    };

    (
        status,
        Json(OtpRejectionResponse {
            verified: false,
            reason,
            message,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use shikkha_application::VerifyRejection;

    use super::rejection_response;

    fn status_for(rejection: VerifyRejection) -> StatusCode {
        rejection_response(rejection).status()
    }

    #[test]
    fn rejections_map_to_distinct_statuses() {
        assert_eq!(status_for(VerifyRejection::InvalidCode), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(VerifyRejection::AlreadyUsed), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(VerifyRejection::Expired), StatusCode::GONE);
        assert_eq!(
            status_for(VerifyRejection::AttemptsExhausted),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn unknown_challenge_is_indistinguishable_from_wrong_code() {
        assert_eq!(
            status_for(VerifyRejection::NotFound),
            status_for(VerifyRejection::InvalidCode)
        );
    }
}
