use std::{fmt::Formatter, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{
    error::EngineError,
    model::capacity::{CapacityId, Commodity},
    quantity::cost::Cost,
};

/// Dutch postcode in its canonical `1234AB` form.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, SerializeDisplay, DeserializeFromStr)]
pub struct Postcode(String);

impl Postcode {
    /// Wrap a postcode that is already in the canonical form.
    pub(crate) fn from_canonical(value: &str) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Postcode {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised: String =
            value.chars().filter(|c| !c.is_whitespace()).map(|c| c.to_ascii_uppercase()).collect();
        let bytes = normalised.as_bytes();
        let is_valid = bytes.len() == 6
            && bytes[0] != b'0'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[4..].iter().all(u8::is_ascii_uppercase);
        if is_valid { Ok(Self(normalised)) } else { Err(EngineError::InvalidPostcode(value.to_string())) }
    }
}

impl std::fmt::Display for Postcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct GridOperatorId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOperator {
    pub id: GridOperatorId,
    pub name: String,
}

/// Inclusive postcode range served by one grid operator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostcodeRange {
    pub from: Postcode,
    pub to: Postcode,
    pub operator: GridOperatorId,
}

impl PostcodeRange {
    #[must_use]
    pub fn contains(&self, postcode: &Postcode) -> bool {
        (&self.from..=&self.to).contains(&postcode)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.from <= other.to && other.from <= self.to
    }
}

/// All-in annual fee («netbeheerkosten») of a grid operator for one connection capacity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridOperatorTariff {
    pub operator: GridOperatorId,
    pub year: i32,
    pub commodity: Commodity,
    pub capacity: CapacityId,
    pub annual_fee: Cost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_parse_postcode() -> Result {
        assert_eq!("1234 ab".parse::<Postcode>()?.as_str(), "1234AB");
        assert_eq!(" 9999zz ".parse::<Postcode>()?.as_str(), "9999ZZ");
        Ok(())
    }

    #[test]
    fn test_reject_postcode() {
        for value in ["", "123AB", "0123AB", "12345A", "1234ABC", "ABCD12"] {
            let error = value.parse::<Postcode>().unwrap_err();
            assert!(error.is_invalid_input(), "{value}");
        }
    }

    #[test]
    fn test_range_contains() -> Result {
        let range = PostcodeRange {
            from: "1000AA".parse()?,
            to: "1099ZZ".parse()?,
            operator: GridOperatorId(1),
        };
        assert!(range.contains(&"1000AA".parse()?));
        assert!(range.contains(&"1055KT".parse()?));
        assert!(range.contains(&"1099ZZ".parse()?));
        assert!(!range.contains(&"1100AA".parse()?));
        assert!(!range.contains(&"9999AA".parse()?));
        Ok(())
    }
}
