//! Tagged reversible encoding of numeric values.
//!
//! Wire form: `FHE-` followed by the standard base64 encoding of the number's
//! shortest decimal representation, e.g. `10` becomes `FHE-MTA=`.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Prefix marking an obfuscated value.
pub const FHE_TAG: &str = "FHE-";

/// Errors produced when an obfuscated value cannot be recovered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The tagged payload is not valid base64.
    #[error("invalid encoded payload: {0}")]
    InvalidPayload(String),

    /// The payload decoded to bytes that are not UTF-8 text.
    #[error("encoded payload is not UTF-8 text")]
    InvalidText,

    /// The recovered text is not a number.
    #[error("not a number: {0:?}")]
    NotANumber(String),
}

/// Encode a numeric value into its tagged form.
pub fn encode(value: f64) -> String {
    format!("{}{}", FHE_TAG, STANDARD.encode(value.to_string()))
}

/// Recover the numeric value from an encoded string.
///
/// Untagged input is parsed directly as a float, so plain numeric strings
/// written by older clients still decode.
pub fn decode(text: &str) -> Result<f64, CodecError> {
    let plain = match text.strip_prefix(FHE_TAG) {
        Some(payload) => {
            let bytes = STANDARD
                .decode(payload.trim())
                .map_err(|e| CodecError::InvalidPayload(e.to_string()))?;
            String::from_utf8(bytes).map_err(|_| CodecError::InvalidText)?
        }
        None => text.to_string(),
    };
    let trimmed = plain.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| CodecError::NotANumber(trimmed.to_string()))
}

/// Arithmetic applied to a decoded value by [`compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Multiply by 1.1.
    Increase10Percent,
    /// Multiply by 0.9.
    Decrease10Percent,
    /// Multiply by 2.
    Double,
    /// Leave the value unchanged.
    Identity,
}

impl Operation {
    /// Resolve an operation name. Unknown names map to [`Operation::Identity`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "increase10%" => Self::Increase10Percent,
            "decrease10%" => Self::Decrease10Percent,
            "double" => Self::Double,
            _ => Self::Identity,
        }
    }

    /// Canonical operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Increase10Percent => "increase10%",
            Self::Decrease10Percent => "decrease10%",
            Self::Double => "double",
            Self::Identity => "identity",
        }
    }

    /// Apply the operation to a plaintext value.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Increase10Percent => value * 1.1,
            Self::Decrease10Percent => value * 0.9,
            Self::Double => value * 2.0,
            Self::Identity => value,
        }
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode, apply `operation`, and re-encode.
pub fn compute(text: &str, operation: impl Into<Operation>) -> Result<String, CodecError> {
    let value = decode(text)?;
    Ok(encode(operation.into().apply(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_encode_is_tagged_base64() {
        assert_eq!(encode(10.0), "FHE-MTA=");
        assert_eq!(encode(2.5), "FHE-Mi41");
    }

    #[test]
    fn test_round_trip() {
        for v in [0.0, 1.0, -3.25, 1234.5678, 1e-7, 9_007_199_254_740_991.0] {
            assert_close(decode(&encode(v)).unwrap(), v);
        }
    }

    #[test]
    fn test_decode_untagged_falls_back_to_float_parse() {
        assert_close(decode("42.5").unwrap(), 42.5);
        assert_close(decode(" 7 ").unwrap(), 7.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("FHE-!!!"), Err(CodecError::InvalidPayload(_))));
        assert!(matches!(decode("abc"), Err(CodecError::NotANumber(_))));
        // "abc" in base64 is "YWJj"
        assert!(matches!(decode("FHE-YWJj"), Err(CodecError::NotANumber(_))));
    }

    #[test]
    fn test_compute_operations() {
        let ten = encode(10.0);
        assert_close(decode(&compute(&ten, "double").unwrap()).unwrap(), 20.0);
        assert_close(decode(&compute(&ten, "increase10%").unwrap()).unwrap(), 11.0);
        assert_close(decode(&compute(&ten, "decrease10%").unwrap()).unwrap(), 9.0);
    }

    #[test]
    fn test_compute_unknown_operation_is_identity() {
        let ten = encode(10.0);
        assert_close(decode(&compute(&ten, "triple").unwrap()).unwrap(), 10.0);
        assert_eq!(Operation::from_name("triple"), Operation::Identity);
    }

    #[test]
    fn test_compute_propagates_decode_error() {
        assert!(compute("FHE-@@", Operation::Double).is_err());
    }
}
