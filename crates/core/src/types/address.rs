//! Shipping address captured at checkout.
//!
//! The address is validated structurally before any transactional work and
//! then frozen onto the order as a JSON snapshot, so later edits to a saved
//! address never change what an order shipped to.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is empty or whitespace.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// A postal address for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Maximum length of any single field.
    pub const MAX_FIELD_LENGTH: usize = 200;

    /// Check that required fields are present and no field is oversized.
    ///
    /// # Errors
    ///
    /// Returns the first failing field, checked in display order.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("fullName", self.full_name.as_str()),
            ("line1", self.line1.as_str()),
            ("city", self.city.as_str()),
            ("state", self.state.as_str()),
            ("postalCode", self.postal_code.as_str()),
            ("country", self.country.as_str()),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField { field });
            }
            check_length(field, value)?;
        }

        if let Some(line2) = &self.line2 {
            check_length("line2", line2)?;
        }
        if let Some(phone) = &self.phone {
            check_length("phone", phone)?;
        }

        Ok(())
    }

    /// Copy with surrounding whitespace removed and blank optionals dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        Self {
            full_name: self.full_name.trim().to_owned(),
            line1: self.line1.trim().to_owned(),
            line2: optional(&self.line2),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
            phone: optional(&self.phone),
        }
    }
}

fn check_length(field: &'static str, value: &str) -> Result<(), AddressError> {
    if value.chars().count() > ShippingAddress::MAX_FIELD_LENGTH {
        return Err(AddressError::TooLong {
            field,
            max: ShippingAddress::MAX_FIELD_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_owned(),
            line1: "12 Orchard Lane".to_owned(),
            line2: None,
            city: "Portland".to_owned(),
            state: "OR".to_owned(),
            postal_code: "97201".to_owned(),
            country: "US".to_owned(),
            phone: None,
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(address().validate().is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let mut addr = address();
        addr.city = "   ".to_owned();
        assert_eq!(
            addr.validate(),
            Err(AddressError::MissingField { field: "city" })
        );
    }

    #[test]
    fn test_field_too_long() {
        let mut addr = address();
        addr.line2 = Some("x".repeat(201));
        assert!(matches!(
            addr.validate(),
            Err(AddressError::TooLong { field: "line2", .. })
        ));
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_optionals() {
        let mut addr = address();
        addr.full_name = "  Ada Lovelace ".to_owned();
        addr.phone = Some("  ".to_owned());

        let normalized = addr.normalized();
        assert_eq!(normalized.full_name, "Ada Lovelace");
        assert_eq!(normalized.phone, None);
    }

    #[test]
    fn test_deserializes_camel_case() {
        let json = r#"{
            "fullName": "Ada Lovelace",
            "line1": "12 Orchard Lane",
            "city": "Portland",
            "state": "OR",
            "postalCode": "97201",
            "country": "US"
        }"#;
        let addr: ShippingAddress = serde_json::from_str(json).unwrap();
        assert_eq!(addr, address());
    }
}
