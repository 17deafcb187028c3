//! Phone number canonicalization.
//!
//! The platform serves the Bangladesh market first, so national-format
//! numbers (`01XXXXXXXXX`) are rewritten with country code 880. Everything
//! else is normalized to a best-effort `+<countrycode><digits>` form.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use shikkha_core::{AppError, AppResult};

/// Number of trailing digits used for fuzzy directory matching.
///
/// Directory records and account records are provisioned independently and
/// often disagree on country-code formatting; comparing the last 10 digits
/// tolerates that drift.
pub const PHONE_SUFFIX_LENGTH: usize = 10;

/// A phone number in canonical `+<countrycode><digits>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses and canonicalizes a raw phone string.
    ///
    /// Returns a validation error when no canonical form can be derived.
    pub fn parse(raw: &str) -> AppResult<Self> {
        normalize(raw)
            .map(Self)
            .ok_or_else(|| AppError::Validation("phone number is not recognizable".to_owned()))
    }

    /// Returns the canonical string, including the leading `+`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the trailing digits used for directory suffix matching.
    ///
    /// `None` when the number has fewer than [`PHONE_SUFFIX_LENGTH`] digits;
    /// short sequences must never suffix-match across country codes.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        let digits = &self.0[1..];
        digits
            .len()
            .checked_sub(PHONE_SUFFIX_LENGTH)
            .map(|start| &digits[start..])
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

/// Canonicalizes a raw phone string, or `None` when unparseable.
fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if has_plus {
        if (8..=15).contains(&digits.len()) {
            return Some(format!("+{digits}"));
        }
        return None;
    }

    // National format: exactly 11 digits with a single leading zero.
    if digits.len() == 11 && digits.starts_with('0') && !digits.starts_with("00") {
        return Some(format!("+880{}", &digits[1..]));
    }

    // Country code already present without the `+`.
    if digits.starts_with("880") && (12..=15).contains(&digits.len()) {
        return Some(format!("+{digits}"));
    }

    // Best-effort international form for plausible lengths.
    if (10..=15).contains(&digits.len()) {
        return Some(format!("+{digits}"));
    }

    None
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{PhoneNumber, normalize};

    #[test]
    fn national_number_gains_country_code() {
        let phone = PhoneNumber::parse("01712345678");
        assert!(phone.is_ok());
        assert_eq!(
            phone.map(String::from).unwrap_or_default(),
            "+8801712345678"
        );
    }

    #[test]
    fn formatted_national_number_is_cleaned() {
        let phone = PhoneNumber::parse("017-1234 5678");
        assert_eq!(
            phone.map(String::from).unwrap_or_default(),
            "+8801712345678"
        );
    }

    #[test]
    fn plus_prefixed_number_keeps_digit_sequence() {
        let phone = PhoneNumber::parse("+880 1712-345678");
        assert_eq!(
            phone.map(String::from).unwrap_or_default(),
            "+8801712345678"
        );
    }

    #[test]
    fn bare_country_code_number_gains_plus() {
        let phone = PhoneNumber::parse("8801712345678");
        assert_eq!(
            phone.map(String::from).unwrap_or_default(),
            "+8801712345678"
        );
    }

    #[test]
    fn other_international_number_is_best_effort() {
        let phone = PhoneNumber::parse("14155552671");
        assert_eq!(phone.map(String::from).unwrap_or_default(), "+14155552671");
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(PhoneNumber::parse("12345").is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(PhoneNumber::parse("").is_err());
    }

    #[test]
    fn letters_only_input_is_rejected() {
        assert!(PhoneNumber::parse("not-a-number").is_err());
    }

    #[test]
    fn suffix_is_last_ten_digits() {
        let phone = PhoneNumber::parse("01712345678").unwrap_or_else(|_| panic!("test phone"));
        assert_eq!(phone.suffix(), Some("1712345678"));
    }

    #[test]
    fn suffix_is_absent_for_short_numbers() {
        let phone = PhoneNumber::parse("+12345678").unwrap_or_else(|_| panic!("test phone"));
        assert_eq!(phone.suffix(), None);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "\\+?[0-9 ()-]{0,20}") {
            if let Some(canonical) = normalize(&raw) {
                prop_assert_eq!(normalize(&canonical), Some(canonical));
            }
        }
    }
}
