use core::convert::From;

/// Errors
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error {
    /// The transmit queue or a buffer has no room for the message
    NotEnoughSpace,
    /// The received frame could not be decoded
    MalformedPacket,
    /// No commissioning session can be allocated
    NoFreeSession,
    /// The sink table has no free slot
    SinkTableFull,
    /// The translation table has no free slot
    TranslationTableFull,
    /// The group table has no free slot
    GroupTableFull,
    /// The requested item was not found
    NotFound,
    /// The configuration is invalid
    ConfigurationError,
    /// A data error has occurred
    DataError(psila_gp_data::Error),
    /// A crypto error has occurred
    CryptoError(psila_crypto::Error),
}

impl From<psila_gp_data::Error> for Error {
    fn from(error: psila_gp_data::Error) -> Self {
        Self::DataError(error)
    }
}

impl From<psila_crypto::Error> for Error {
    fn from(error: psila_crypto::Error) -> Self {
        Self::CryptoError(error)
    }
}
