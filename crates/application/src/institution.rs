//! Institution and account lookup ports consumed by the HTTP surface.

use async_trait::async_trait;

use shikkha_core::{AppResult, InstitutionId};
use shikkha_domain::{AccountStatus, LoginScope, PhoneNumber, UserId};

/// An institution (tenant) resolved from its public slug.
#[derive(Debug, Clone)]
pub struct Institution {
    /// Partition key for all of the institution's records.
    pub id: InstitutionId,
    /// URL-facing slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Whether the institution is currently enabled on the platform.
    pub active: bool,
}

/// Repository port for institution resolution.
#[async_trait]
pub trait InstitutionRepository: Send + Sync {
    /// Finds an institution by its public slug.
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Institution>>;
}

/// An account matched against a phone number and login scope.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    /// Account identifier.
    pub user_id: UserId,
    /// Lifecycle state gating login.
    pub status: AccountStatus,
}

/// Repository port for account lookup at code-issuance time.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Finds the account holding this phone number under the given scope.
    async fn find_by_phone_and_scope(
        &self,
        institution_id: InstitutionId,
        phone: &PhoneNumber,
        scope: LoginScope,
    ) -> AppResult<Option<AccountRecord>>;
}
