//! Infrastructure adapters: PostgreSQL repositories, Redis rate limiting,
//! and SMS delivery providers.

#![forbid(unsafe_code)]

mod console_sms_service;
mod postgres_account_repository;
mod postgres_challenge_repository;
mod postgres_institution_repository;
mod postgres_rate_limit_repository;
mod postgres_student_directory;
mod redis_rate_limit_repository;
mod twilio_verify_service;

pub use console_sms_service::ConsoleSmsService;
pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_challenge_repository::PostgresChallengeRepository;
pub use postgres_institution_repository::PostgresInstitutionRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_student_directory::PostgresStudentDirectory;
pub use redis_rate_limit_repository::RedisRateLimitRepository;
pub use twilio_verify_service::{TwilioVerifyConfig, TwilioVerifyService};
