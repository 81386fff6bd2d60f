//! Wrapper for representing byte buffers as `0x`-prefixed lowercase hexadecimal.
//!
//! `HexBytes` wraps `Vec<u8>`, providing consistent serialization/deserialization to hex
//! strings while emitting compact hex in `Debug` output. It derefs to a slice so existing
//! byte oriented code can continue to operate without additional conversions. Every blob
//! in a transformation value set (library addresses, immutable values, auxdata, constructor
//! arguments) is carried as `HexBytes`.

use crate::normalize_hex_string;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// Wrapper around `Vec<u8>` that renders as `0x`-prefixed lowercase hex.
///
/// # Examples
///
/// ```
/// use crucible_core::HexBytes;
///
/// let bytes = HexBytes(vec![0xde, 0xad, 0xbe, 0xef]);
/// assert_eq!(bytes.to_string(), "0xdeadbeef");
/// assert_eq!(bytes.to_hex(), "deadbeef");
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Lowercase hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parses hex with or without `0x`; odd-length input is left-padded with a zero nibble.
    pub fn from_hex(input: &str) -> crate::Result<Self> {
        let normalized = normalize_hex_string(input)?;
        Ok(Self(hex::decode(normalized)?))
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<HexBytes> for Vec<u8> {
    fn from(bytes: HexBytes) -> Self {
        bytes.0
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for HexBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HexBytesVisitor;

        impl<'de> Visitor<'de> for HexBytesVisitor {
            type Value = HexBytes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a hex string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                HexBytes::from_hex(v).map_err(E::custom)
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_str(HexBytesVisitor)
    }
}

impl PartialEq<Vec<u8>> for HexBytes {
    fn eq(&self, other: &Vec<u8>) -> bool {
        &self.0 == other
    }
}

impl PartialEq<HexBytes> for Vec<u8> {
    fn eq(&self, other: &HexBytes) -> bool {
        self == &other.0
    }
}
