//! # Error handling

use core::convert::From;

/// Errors
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error {
    /// Not enough space for the operation
    NotEnoughSpace,
    /// Wrong number of bytes provided to the operation
    WrongNumberOfBytes,
    /// The value provided is invalid
    InvalidValue,
    /// The frame type is unknown
    UnknownFrameType,
    /// The command identifier is unknown
    UnknownCommand,
    /// The GPD application identifier is unknown
    UnknownApplicationIdentifier,
    /// The security level is the reserved value
    ReservedSecurityLevel,
    /// The payload does not match its declared length
    PayloadLengthMismatch,
    /// A list has more items than the protocol permits
    TooManyItems,
    /// A crypto error has occurd
    CryptoError(psila_crypto::Error),
}

impl From<psila_crypto::Error> for Error {
    fn from(error: psila_crypto::Error) -> Self {
        Self::CryptoError(error)
    }
}
