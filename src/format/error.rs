//! Errors raised while reading or writing `.cmc` documents.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum CmcError {
    /// Underlying file system failure.
    Io(io::Error),
    /// The stream does not start with the `CMC\x01` signature.
    BadMagic,
    /// A chunk or field ended before its declared size.
    Truncated,
    /// No `CANV` chunk was found.
    MissingCanvas,
    /// A tile payload decompressed to the wrong number of bytes.
    TileSize { expected: usize, actual: usize },
    /// A tile payload is not a valid zlib stream.
    Decompress,
    /// A layer name is not valid UTF-8.
    InvalidString,
}

impl fmt::Display for CmcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmcError::Io(err) => write!(f, "i/o error: {}", err),
            CmcError::BadMagic => write!(f, "not a cmc document (invalid magic header)"),
            CmcError::Truncated => write!(f, "unexpected end of cmc data"),
            CmcError::MissingCanvas => write!(f, "cmc document has no CANV chunk"),
            CmcError::TileSize { expected, actual } => {
                write!(f, "tile payload is {} bytes, expected {}", actual, expected)
            }
            CmcError::Decompress => write!(f, "tile payload could not be decompressed"),
            CmcError::InvalidString => write!(f, "invalid string encoding"),
        }
    }
}

impl std::error::Error for CmcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CmcError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CmcError {
    fn from(err: io::Error) -> Self {
        CmcError::Io(err)
    }
}
