//! Core results and error types

use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read file at the specified path.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// The path to the file that could not be read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode hex string.
    #[error("hex decode failed: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// A character outside the hex alphabet appeared outside a link placeholder.
    #[error("invalid bytecode character '{ch}' at offset {offset}")]
    InvalidCharacter {
        /// The offending character.
        ch: char,
        /// Offset in hex digits.
        offset: usize,
    },

    /// The hex string has an odd number of digits.
    #[error("hex string has odd length: {0}")]
    OddLength(usize),

    /// The bytecode still contains a library placeholder and cannot be turned into bytes.
    #[error("bytecode is not fully linked: placeholder at offset {0}")]
    UnlinkedBytecode(usize),

    /// A placeholder or its counterpart in the real bytecode runs past the end.
    #[error("library placeholder at offset {0} exceeds bytecode bounds")]
    PlaceholderOutOfBounds(usize),

    /// The real bytecode does not hold a 20-byte address where a placeholder sits.
    #[error("no address found at placeholder offset {0}")]
    InvalidLibraryAddress(usize),

    /// An immutable reference points past the end of the runtime bytecode.
    #[error("immutable {id} reference at byte {start} (length {length}) exceeds bytecode bounds")]
    ImmutableOutOfBounds {
        /// AST id of the immutable variable.
        id: String,
        /// Start of the reference in bytes.
        start: usize,
        /// Length of the reference in bytes.
        length: usize,
    },

    /// The code does not end with a decodable CBOR metadata trailer.
    #[error("bytecode has no CBOR auxdata trailer")]
    MissingAuxdata,

    /// A transformation has no value to replay.
    #[error("no {reason} value recorded for id {id:?}")]
    MissingValue {
        /// Reason of the transformation.
        reason: String,
        /// Identifier of the transformation, if any.
        id: Option<String>,
    },

    /// A transformation span does not fit in the bytecode being rebuilt.
    #[error("transformation at offset {0} exceeds bytecode bounds")]
    TransformationOutOfBounds(usize),

    /// Address string could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Salt could not be parsed as hex or decimal, or exceeds 32 bytes.
    #[error("invalid salt: {0}")]
    InvalidSalt(String),
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
