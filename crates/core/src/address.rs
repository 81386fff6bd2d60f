//! Contract address derivation for `CREATE` and `CREATE2`.

use crate::result::{Error, Result};
use alloy::primitives::{Address, B256, U256};
use std::str::FromStr;

/// Address produced by a `CREATE` from `sender` at transaction `nonce`.
pub fn create_address(sender: Address, nonce: u64) -> Address {
    sender.create(nonce)
}

/// Address produced by a `CREATE2` of `creation_code ‖ constructor_args` from `deployer`.
pub fn create2_address(
    deployer: Address,
    salt: B256,
    creation_code: &[u8],
    constructor_args: &[u8],
) -> Address {
    let mut init_code = Vec::with_capacity(creation_code.len() + constructor_args.len());
    init_code.extend_from_slice(creation_code);
    init_code.extend_from_slice(constructor_args);
    deployer.create2_from_code(salt, init_code)
}

/// Parses a salt given as `0x`-prefixed hex (left-padded to 32 bytes) or as a decimal number.
pub fn parse_salt(input: &str) -> Result<B256> {
    let trimmed = input.trim();
    if let Some(hex_digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        let normalized = crate::normalize_hex_string(hex_digits)
            .map_err(|_| Error::InvalidSalt(input.to_owned()))?;
        let bytes = hex::decode(normalized).map_err(|_| Error::InvalidSalt(input.to_owned()))?;
        if bytes.len() > 32 {
            return Err(Error::InvalidSalt(input.to_owned()));
        }
        let mut salt = [0u8; 32];
        salt[32 - bytes.len()..].copy_from_slice(&bytes);
        return Ok(B256::from(salt));
    }

    let value =
        U256::from_str_radix(trimmed, 10).map_err(|_| Error::InvalidSalt(input.to_owned()))?;
    Ok(B256::from(value.to_be_bytes::<32>()))
}

/// Parses a hex address, accepting any casing.
pub fn parse_address(input: &str) -> Result<Address> {
    Address::from_str(input.trim()).map_err(|_| Error::InvalidAddress(input.to_owned()))
}

/// EIP-55 checksummed rendering.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Case-insensitive comparison of two address strings.
pub fn same_address(a: &str, b: &str) -> bool {
    let strip = |s: &str| {
        let s = s.trim();
        s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s)
            .to_ascii_lowercase()
    };
    strip(a) == strip(b)
}
