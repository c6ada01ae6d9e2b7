use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const GSTIN_CHARSET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const OTHER_TERRITORY: u8 = 97;

const STATE_NAMES: [&str; 38] = [
    "Jammu and Kashmir",
    "Himachal Pradesh",
    "Punjab",
    "Chandigarh",
    "Uttarakhand",
    "Haryana",
    "Delhi",
    "Rajasthan",
    "Uttar Pradesh",
    "Bihar",
    "Sikkim",
    "Arunachal Pradesh",
    "Nagaland",
    "Manipur",
    "Mizoram",
    "Tripura",
    "Meghalaya",
    "Assam",
    "West Bengal",
    "Jharkhand",
    "Odisha",
    "Chhattisgarh",
    "Madhya Pradesh",
    "Gujarat",
    "Daman and Diu",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Maharashtra",
    "Andhra Pradesh (Before Division)",
    "Karnataka",
    "Goa",
    "Lakshadweep",
    "Kerala",
    "Tamil Nadu",
    "Puducherry",
    "Andaman and Nicobar Islands",
    "Telangana",
    "Andhra Pradesh",
    "Ladakh",
];

/// Two-digit GST state code (01-38, 97 for other territory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StateCode(u8);

impl StateCode {
    pub fn new(code: u8) -> Result<Self, ValidationError> {
        if (1..=STATE_NAMES.len() as u8).contains(&code) || code == OTHER_TERRITORY {
            Ok(Self(code))
        } else {
            Err(ValidationError::InvalidStateCode(code.to_string()))
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let code: u8 = trimmed
            .parse()
            .map_err(|_| ValidationError::InvalidStateCode(trimmed.to_string()))?;
        Self::new(code)
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        if self.0 == OTHER_TERRITORY {
            "Other Territory"
        } else {
            STATE_NAMES[usize::from(self.0) - 1]
        }
    }
}

impl TryFrom<u8> for StateCode {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StateCode> for u8 {
    fn from(value: StateCode) -> Self {
        value.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A GST registration number. Parsing checks length, charset, state prefix and
/// the trailing check character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gstin(String);

impl Gstin {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let normalized = value.trim().to_ascii_uppercase();
        let invalid = || ValidationError::InvalidGstin(normalized.clone());

        if normalized.len() != 15 || !normalized.bytes().all(|b| GSTIN_CHARSET.contains(&b)) {
            return Err(invalid());
        }
        StateCode::parse(&normalized[..2]).map_err(|_| invalid())?;

        let expected = gstin_check_char(&normalized.as_bytes()[..14]);
        if normalized.as_bytes()[14] != expected {
            return Err(invalid());
        }

        Ok(Self(normalized))
    }

    pub fn state(&self) -> StateCode {
        // Prefix validated in `parse`.
        StateCode(self.0[..2].parse().unwrap_or(OTHER_TERRITORY))
    }

    pub fn pan(&self) -> &str {
        &self.0[2..12]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Gstin {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Gstin> for String {
    fn from(value: Gstin) -> Self {
        value.0
    }
}

impl fmt::Display for Gstin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn gstin_check_char(body: &[u8]) -> u8 {
    let sum: u32 = body
        .iter()
        .enumerate()
        .map(|(index, byte)| {
            let value = GSTIN_CHARSET
                .iter()
                .position(|c| c == byte)
                .unwrap_or_default() as u32;
            let product = value * if index % 2 == 0 { 1 } else { 2 };
            product / 36 + product % 36
        })
        .sum();
    GSTIN_CHARSET[((36 - sum % 36) % 36) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyType {
    IntraState,
    InterState,
}

impl SupplyType {
    /// Place-of-supply rule: inter-state only when the customer's state is
    /// known and differs from the seller's.
    pub fn classify(seller: StateCode, customer: Option<StateCode>) -> Self {
        match customer {
            Some(state) if state != seller => SupplyType::InterState,
            _ => SupplyType::IntraState,
        }
    }

    pub fn is_inter_state(&self) -> bool {
        matches!(self, SupplyType::InterState)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyType::IntraState => "INTRA_STATE",
            SupplyType::InterState => "INTER_STATE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INTRA_STATE" => Some(SupplyType::IntraState),
            "INTER_STATE" => Some(SupplyType::InterState),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_cover_union_territories_and_other_territory() {
        assert_eq!(StateCode::parse("27").unwrap().name(), "Maharashtra");
        assert_eq!(StateCode::parse(" 7 ").unwrap().to_string(), "07");
        assert_eq!(StateCode::new(38).unwrap().name(), "Ladakh");
        assert_eq!(StateCode::new(97).unwrap().name(), "Other Territory");
        assert!(StateCode::new(0).is_err());
        assert!(StateCode::new(39).is_err());
        assert!(StateCode::parse("MH").is_err());
    }

    #[test]
    fn gstin_parses_and_exposes_state_and_pan() {
        let gstin = Gstin::parse(" 27aapfu0939f1zv ").unwrap();
        assert_eq!(gstin.as_str(), "27AAPFU0939F1ZV");
        assert_eq!(gstin.state().code(), 27);
        assert_eq!(gstin.pan(), "AAPFU0939F");
    }

    #[test]
    fn gstin_rejects_bad_check_character_and_shape() {
        assert_eq!(
            Gstin::parse("07AAACR5055K1Z7"),
            Err(ValidationError::InvalidGstin("07AAACR5055K1Z7".to_string()))
        );
        assert!(Gstin::parse("27AAPFU0939F1Z").is_err());
        assert!(Gstin::parse("99AAPFU0939F1ZV").is_err());
        assert!(Gstin::parse("27AAPFU0939F1Z-").is_err());
    }

    #[test]
    fn supply_is_inter_state_only_for_a_known_different_state() {
        let maharashtra = StateCode::new(27).unwrap();
        let karnataka = StateCode::new(29).unwrap();

        assert_eq!(
            SupplyType::classify(maharashtra, Some(karnataka)),
            SupplyType::InterState
        );
        assert_eq!(
            SupplyType::classify(maharashtra, Some(maharashtra)),
            SupplyType::IntraState
        );
        assert_eq!(
            SupplyType::classify(maharashtra, None),
            SupplyType::IntraState
        );
    }

    #[test]
    fn state_code_deserialization_is_validated() {
        let parsed: StateCode = serde_json::from_str("29").unwrap();
        assert_eq!(parsed.code(), 29);
        assert!(serde_json::from_str::<StateCode>("55").is_err());
    }
}
