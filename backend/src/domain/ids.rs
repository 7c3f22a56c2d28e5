//! Identifier newtypes shared across the domain.
//!
//! Display, store, and brand identifiers are opaque strings minted by
//! onboarding or reserved by the store repository. Wrapping them keeps the
//! orchestrator honest about which identifier it is holding.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation error returned when constructing an identifier newtype.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdValidationError {
    /// Identifier is empty after trimming whitespace.
    #[error("{kind} identifier must not be empty")]
    Empty {
        /// Which identifier kind was being constructed.
        kind: &'static str,
    },
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Construct the identifier, rejecting blank input.
            pub fn new(value: impl Into<String>) -> Result<Self, IdValidationError> {
                let raw = value.into();
                if raw.trim().is_empty() {
                    return Err(IdValidationError::Empty { kind: $kind });
                }
                Ok(Self(raw))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    };
}

string_id!(
    /// Identifier of a physical display unit.
    DisplayId,
    "display"
);
string_id!(
    /// Identifier of a retail store record.
    StoreId,
    "store"
);
string_id!(
    /// Identifier of a brand tenant account.
    BrandId,
    "brand"
);
string_id!(
    /// Brand-scoped product SKU.
    Sku,
    "sku"
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn rejects_blank_identifiers(#[case] raw: &str) {
        assert!(DisplayId::new(raw).is_err());
        assert!(StoreId::new(raw).is_err());
        assert!(Sku::new(raw).is_err());
    }

    #[test]
    fn accepts_and_displays_clean_input() {
        let id = StoreId::new("S-1").expect("valid id");
        assert_eq!(id.as_str(), "S-1");
        assert_eq!(id.to_string(), "S-1");
    }
}
