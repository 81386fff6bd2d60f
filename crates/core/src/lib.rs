pub mod address;
pub mod auxdata;
pub mod bytecode;
pub mod hex_bytes;
pub mod link;
pub mod result;
pub mod transformation;

pub use bytecode::Bytecode;
pub use hex_bytes::HexBytes;
pub use result::{Error, Result};
pub use transformation::{Transformation, TransformationKind, TransformationReason, TransformationValues};

use std::path::Path;

/// Strips an optional `0x`, trims whitespace and lowercases a hex string.
///
/// Odd-length input is left-padded with a single zero nibble. Characters outside the hex
/// alphabet are rejected with their offset.
pub fn normalize_hex_string(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let raw = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if let Some((offset, ch)) = raw.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(Error::InvalidCharacter { ch, offset });
    }

    let mut normalized = String::with_capacity(raw.len() + 1);
    if raw.len() % 2 != 0 {
        normalized.push('0');
    }
    normalized.push_str(&raw.to_ascii_lowercase());
    Ok(normalized)
}

/// Reads bytecode either from a literal hex string or from a file holding one.
///
/// Library placeholders are preserved; call [`Bytecode::to_bytes`] when raw bytes are needed.
pub fn input_to_bytecode(input: &str, is_file: bool) -> Result<Bytecode> {
    if is_file {
        let path = Path::new(input);
        let contents = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("read {} characters of bytecode from {}", contents.len(), input);
        Bytecode::parse(&contents)
    } else {
        Bytecode::parse(input)
    }
}
