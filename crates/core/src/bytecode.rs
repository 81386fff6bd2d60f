//! Hex-encoded EVM bytecode that may still contain unresolved library placeholders.
//!
//! Compilers emit `__`-prefixed, 40 character tokens where a library address goes, so a
//! template straight out of the compiler is not valid hex. [`Bytecode`] keeps the code as
//! normalized text (lowercase hex digits, no `0x`, placeholders verbatim) and all offsets
//! used by the matchers and transformations are measured in hex digits of that text.

use crate::result::{Error, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Marker that starts a library placeholder.
pub const PLACEHOLDER_MARKER: &str = "__";

/// Length of a library placeholder in hex digits (the width of a 20-byte address).
pub const PLACEHOLDER_LEN: usize = 40;

/// Normalized hex bytecode without `0x` prefix.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytecode(String);

impl Bytecode {
    /// Parses bytecode with or without `0x`.
    ///
    /// Hex digits are lowercased. Placeholders (`__` followed by 38 more characters) are
    /// kept byte-for-byte, since legacy placeholders embed case-sensitive library names.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let raw = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = raw.as_bytes();
        let mut normalized = String::with_capacity(raw.len());
        let mut offset = 0;
        while offset < bytes.len() {
            if raw[offset..].starts_with(PLACEHOLDER_MARKER) {
                let end = offset + PLACEHOLDER_LEN;
                let placeholder = raw
                    .get(offset..end)
                    .ok_or(Error::PlaceholderOutOfBounds(offset))?;
                if let Some((idx, ch)) = placeholder.char_indices().find(|(_, c)| !c.is_ascii())
                {
                    return Err(Error::InvalidCharacter {
                        ch,
                        offset: offset + idx,
                    });
                }
                normalized.push_str(placeholder);
                offset = end;
                continue;
            }

            let ch = raw[offset..]
                .chars()
                .next()
                .ok_or(Error::OddLength(raw.len()))?;
            if !ch.is_ascii_hexdigit() {
                return Err(Error::InvalidCharacter { ch, offset });
            }
            normalized.push(ch.to_ascii_lowercase());
            offset += 1;
        }

        if normalized.len() % 2 != 0 {
            return Err(Error::OddLength(normalized.len()));
        }
        Ok(Self(normalized))
    }

    /// Encodes raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The normalized hex text without `0x`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Length in hex digits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Length in bytes.
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// True for the `0x` stub compilers emit for abstract contracts and interfaces.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Offset of the first unresolved placeholder, if any.
    pub fn first_placeholder(&self) -> Option<usize> {
        self.0.find(PLACEHOLDER_MARKER)
    }

    /// Decodes to raw bytes; fails while placeholders remain.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if let Some(offset) = self.first_placeholder() {
            return Err(Error::UnlinkedBytecode(offset));
        }
        Ok(hex::decode(&self.0)?)
    }

    pub fn starts_with(&self, prefix: &Bytecode) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Sub-range in hex digits, clamped to the end of the code.
    ///
    /// `start` and `end` are expected to be even so the result stays byte aligned.
    pub fn slice(&self, start: usize, end: usize) -> Bytecode {
        let end = end.min(self.0.len());
        let start = start.min(end);
        Bytecode(self.0[start..end].to_owned())
    }

    /// The first `len` hex digits.
    pub fn prefix(&self, len: usize) -> Bytecode {
        self.slice(0, len)
    }

    /// Everything from `start` (in hex digits) to the end.
    pub fn suffix_from(&self, start: usize) -> Bytecode {
        self.slice(start, self.0.len())
    }

    pub(crate) fn from_normalized(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > 64 {
            write!(f, "0x{}..({} bytes)", &self.0[..64], self.byte_len())
        } else {
            write!(f, "0x{}", self.0)
        }
    }
}

impl FromStr for Bytecode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Bytecode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bytecode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BytecodeVisitor;

        impl<'de> Visitor<'de> for BytecodeVisitor {
            type Value = Bytecode;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a hex bytecode string")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Bytecode::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(BytecodeVisitor)
    }
}
