/// Crypto backend error codes
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error {
    /// Operation is not implemented
    NotImplemented,
    /// The key have a invalid size
    InvalidKeySize,
    /// The data has a invalid size
    InvalidDataSize,
    /// The nonce has a invalid size
    InvalidNonceSize,
    /// The message integrity code (MIC) has invalid size
    InvalidIntegrityCodeSize,
    /// The message integrity code (MIC) check failed
    IntegrityCheckFailed,
    /// The output buffer is too small
    NotEnoughSpace,
    /// Generic backend error
    BackendError,
}
