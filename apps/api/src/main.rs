//! Shikkha OTP authentication API composition root.

#![forbid(unsafe_code)]

mod api_router;
mod auth;
mod error;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use shikkha_application::{
    OtpService, RateLimitRepository, RateLimitService, SmsVerificationService, VisibilityService,
};
use shikkha_core::AppError;
use shikkha_infrastructure::{
    ConsoleSmsService, PostgresAccountRepository, PostgresChallengeRepository,
    PostgresInstitutionRepository, PostgresRateLimitRepository, PostgresStudentDirectory,
    RedisRateLimitRepository, TwilioVerifyConfig, TwilioVerifyService,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let code_secret = required_env("OTP_CODE_SECRET")?;

    if code_secret.len() < 32 {
        return Err(AppError::Validation(
            "OTP_CODE_SECRET must be at least 32 characters".to_owned(),
        ));
    }

    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_owned());
    let is_production = app_env.eq_ignore_ascii_case("production");

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let cors_origin = env::var("CORS_ALLOWED_ORIGIN")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            HeaderValue::from_str(value.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid CORS_ALLOWED_ORIGIN: {error}"))
            })
        })
        .transpose()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let delivery = build_delivery(is_production)?;
    let rate_limit_repository = build_rate_limit_repository(pool.clone()).await?;

    let otp_service = OtpService::new(
        Arc::new(PostgresChallengeRepository::new(pool.clone())),
        delivery,
        code_secret,
        !is_production,
    );
    let rate_limit_service = RateLimitService::new(rate_limit_repository);
    let visibility_service =
        VisibilityService::new(Arc::new(PostgresStudentDirectory::new(pool.clone())));

    let app_state = AppState {
        otp_service,
        rate_limit_service: rate_limit_service.clone(),
        visibility_service,
        institution_repository: Arc::new(PostgresInstitutionRepository::new(pool.clone())),
        account_repository: Arc::new(PostgresAccountRepository::new(pool)),
    };

    spawn_rate_limit_cleanup(rate_limit_service);

    let router = api_router::build_router(app_state, cors_origin);

    let ip = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Validation(format!("invalid API_HOST: {error}")))?;
    let addr = SocketAddr::new(ip, api_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {addr}: {error}")))?;

    info!(%addr, environment = app_env.as_str(), "listening");

    axum::serve(listener, router)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))
}

/// Selects the SMS delivery strategy once at startup.
///
/// Production deployments must configure the external verification provider;
/// degrading to console delivery there would silently skip real delivery.
fn build_delivery(is_production: bool) -> Result<Arc<dyn SmsVerificationService>, AppError> {
    let account_sid = env::var("TWILIO_ACCOUNT_SID").ok();
    let auth_token = env::var("TWILIO_AUTH_TOKEN").ok();
    let verify_service_sid = env::var("TWILIO_VERIFY_SERVICE_SID").ok();

    match (account_sid, auth_token, verify_service_sid) {
        (Some(account_sid), Some(auth_token), Some(verify_service_sid)) => {
            let service = TwilioVerifyService::new(TwilioVerifyConfig {
                account_sid,
                auth_token,
                verify_service_sid,
            })?;
            info!("using external SMS verification provider");
            Ok(Arc::new(service))
        }
        _ if is_production => Err(AppError::Validation(
            "production requires TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, \
             and TWILIO_VERIFY_SERVICE_SID"
                .to_owned(),
        )),
        _ => {
            info!("no SMS provider configured, using console delivery");
            Ok(Arc::new(ConsoleSmsService::new()))
        }
    }
}

/// Selects the rate-limit backend: Redis when configured, else Postgres.
async fn build_rate_limit_repository(
    pool: sqlx::PgPool,
) -> Result<Arc<dyn RateLimitRepository>, AppError> {
    let Some(redis_url) = env::var("REDIS_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
    else {
        return Ok(Arc::new(PostgresRateLimitRepository::new(pool)));
    };

    let client = redis::Client::open(redis_url)
        .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
    let connection = redis::aio::ConnectionManager::new(client)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

    info!("using redis rate limiting");
    Ok(Arc::new(RedisRateLimitRepository::new(
        connection,
        "shikkha:ratelimit",
    )))
}

/// Periodically prunes expired rate-limit windows.
///
/// Challenge rows are deliberately not swept; expiry is evaluated against
/// the observed time whenever a challenge is touched.
fn spawn_rate_limit_cleanup(service: RateLimitService) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.cleanup().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "pruned expired rate limit windows");
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "rate limit cleanup failed"),
            }
        }
    });
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} must be set")))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
