//! Fixed-point math utilities for deterministic simulation.
//!
//! Health and ability power are real numbers. They are stored as fixed-point values so
//! that fractional damage adds up identically on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Clamp a fixed-point value into `[min, max]`.
#[must_use]
pub fn clamp_fixed(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for fixed-point numbers written by hand in config files.
///
/// Scenario authors write `power: 2.5`, not raw bits. Values are read as `f64`
/// once at load time and converted; the simulation itself never touches floats.
pub mod fixed_decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_fixed() {
        let max = Fixed::from_num(10);
        assert_eq!(clamp_fixed(Fixed::from_num(-3), Fixed::ZERO, max), Fixed::ZERO);
        assert_eq!(clamp_fixed(Fixed::from_num(12), Fixed::ZERO, max), max);
        assert_eq!(
            clamp_fixed(Fixed::from_num(2.5), Fixed::ZERO, max),
            Fixed::from_num(2.5)
        );
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_decimal_serde_roundtrip_in_ron() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "fixed_decimal_serde")]
            power: Fixed,
        }

        let parsed: Wrapper = ron::from_str("(power: -2.5)").unwrap();
        assert_eq!(parsed.power, Fixed::from_num(-2.5));
    }
}
