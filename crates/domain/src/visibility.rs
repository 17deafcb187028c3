//! Declarative student-record visibility filters.
//!
//! The resolver computes *what* a viewer may see as a data value; the
//! persistence layer renders that value into a query predicate. Returning a
//! filter instead of a list of ids keeps the policy applicable to any student
//! query without materializing row sets.

use serde::{Deserialize, Serialize};
use shikkha_core::InstitutionId;
use uuid::Uuid;

use crate::{EmailAddress, PhoneNumber, UserRole};

/// Unique identifier for a student directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(Uuid);

impl StudentId {
    /// Creates a new random student identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a student identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Unique identifier for a class (section) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(Uuid);

impl ClassId {
    /// Creates a new random class identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a class identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Unique identifier for a teacher directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeacherId(Uuid);

impl TeacherId {
    /// Creates a new random teacher identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a teacher identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// The authenticated caller a visibility decision is made for.
#[derive(Debug, Clone)]
pub struct Viewer {
    /// Stable account subject (account linkage key into the directory).
    pub subject: String,
    /// Platform role.
    pub role: UserRole,
    /// Account email, when present.
    pub email: Option<EmailAddress>,
    /// Account phone, when present.
    pub phone: Option<PhoneNumber>,
    /// Institution the viewer belongs to.
    pub institution_id: InstitutionId,
}

/// Declarative filter restricting which student records a viewer sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentVisibility {
    /// No restriction beyond the institution partition.
    Unrestricted,
    /// Students enrolled in classes where the viewer is the class teacher.
    ClassesLedBy(Vec<ClassId>),
    /// Students whose own stored contact matches the viewer's identity.
    ContactMatch {
        /// Case-insensitive email equality, when the viewer has an email.
        email: Option<String>,
        /// Trailing-digit phone match, when the viewer has a long-enough phone.
        phone_suffix: Option<String>,
    },
    /// Students linked through a guardian whose contact matches the viewer.
    GuardianContactMatch {
        /// Case-insensitive email equality, when the viewer has an email.
        email: Option<String>,
        /// Trailing-digit phone match, when the viewer has a long-enough phone.
        phone_suffix: Option<String>,
    },
    /// Matches no rows.
    Nothing,
}

impl StudentVisibility {
    /// Builds a contact filter from optional identity parts.
    ///
    /// Collapses to [`StudentVisibility::Nothing`] when the viewer has no
    /// usable contact point, so an account with neither email nor phone can
    /// never widen its own visibility.
    #[must_use]
    pub fn contact_match(email: Option<&EmailAddress>, phone: Option<&PhoneNumber>) -> Self {
        let email = email.map(|value| value.as_str().to_owned());
        let phone_suffix = phone.and_then(PhoneNumber::suffix).map(str::to_owned);
        if email.is_none() && phone_suffix.is_none() {
            return Self::Nothing;
        }
        Self::ContactMatch {
            email,
            phone_suffix,
        }
    }

    /// Builds a guardian-linked contact filter from optional identity parts.
    #[must_use]
    pub fn guardian_contact_match(
        email: Option<&EmailAddress>,
        phone: Option<&PhoneNumber>,
    ) -> Self {
        let email = email.map(|value| value.as_str().to_owned());
        let phone_suffix = phone.and_then(PhoneNumber::suffix).map(str::to_owned);
        if email.is_none() && phone_suffix.is_none() {
            return Self::Nothing;
        }
        Self::GuardianContactMatch {
            email,
            phone_suffix,
        }
    }

    /// Whether the filter can never match a row.
    #[must_use]
    pub fn matches_nothing(&self) -> bool {
        match self {
            Self::Nothing => true,
            Self::ClassesLedBy(classes) => classes.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StudentVisibility;
    use crate::{EmailAddress, PhoneNumber};

    #[test]
    fn empty_class_list_matches_nothing() {
        assert!(StudentVisibility::ClassesLedBy(Vec::new()).matches_nothing());
    }

    #[test]
    fn contactless_viewer_matches_nothing() {
        assert!(StudentVisibility::contact_match(None, None).matches_nothing());
        assert!(StudentVisibility::guardian_contact_match(None, None).matches_nothing());
    }

    #[test]
    fn short_phone_without_email_matches_nothing() {
        let phone = PhoneNumber::parse("+12345678").unwrap_or_else(|_| panic!("test phone"));
        assert!(StudentVisibility::contact_match(None, Some(&phone)).matches_nothing());
    }

    #[test]
    fn contact_filter_carries_suffix_and_email() {
        let email = EmailAddress::new("rahim@example.com").unwrap_or_else(|_| panic!("test email"));
        let phone = PhoneNumber::parse("01712345678").unwrap_or_else(|_| panic!("test phone"));
        let filter = StudentVisibility::contact_match(Some(&email), Some(&phone));
        assert_eq!(
            filter,
            StudentVisibility::ContactMatch {
                email: Some("rahim@example.com".to_owned()),
                phone_suffix: Some("1712345678".to_owned()),
            }
        );
    }

    #[test]
    fn unrestricted_is_not_empty() {
        assert!(!StudentVisibility::Unrestricted.matches_nothing());
    }
}
