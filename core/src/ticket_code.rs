//! Human-readable ticket codes.
//!
//! A code is a two-letter category prefix and a zero-padded sequence,
//! e.g. `IM-045`. The sequence comes from the store's monotonic ticket
//! counter, consumed inside the creation transaction, so codes are unique
//! without a read-then-compute race window.

use crate::types::ServiceCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ticket code such as `IM-045`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    /// Wrap a code string (e.g. read back from the store or a request path).
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Build the code for `sequence` in `category`.
    ///
    /// Sequences are zero-padded to three digits; beyond 999 the number
    /// simply grows wider.
    #[must_use]
    pub fn assign(category: ServiceCategory, sequence: i64) -> Self {
        Self(format!("{}-{:03}", category.prefix(), sequence))
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TicketCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_prefixes() {
        assert_eq!(
            TicketCode::assign(ServiceCategory::Immigration, 45).as_str(),
            "IM-045"
        );
        assert_eq!(
            TicketCode::assign(ServiceCategory::TaxService, 1).as_str(),
            "TX-001"
        );
    }

    #[test]
    fn generic_prefix_for_unmapped_category() {
        assert_eq!(
            TicketCode::assign(ServiceCategory::LandRegistration, 7).as_str(),
            "GN-007"
        );
    }

    #[test]
    fn sequence_widens_past_three_digits() {
        assert_eq!(
            TicketCode::assign(ServiceCategory::Other, 1234).as_str(),
            "OT-1234"
        );
    }

    proptest! {
        #[test]
        fn codes_always_match_the_documented_shape(seq in 1i64..100_000) {
            let code = TicketCode::assign(ServiceCategory::Immigration, seq);
            let (prefix, number) = code.as_str().split_once('-').unwrap_or(("", ""));
            prop_assert_eq!(prefix, "IM");
            prop_assert!(number.len() >= 3);
            prop_assert!(number.chars().all(|c| c.is_ascii_digit()));
            prop_assert_eq!(number.parse::<i64>().ok(), Some(seq));
        }
    }
}
