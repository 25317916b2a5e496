use thiserror::Error;

/// The SCRAM client error cases.
///
/// A signature mismatch in the server's final message is not an error. It is reported as
/// `Ok(false)` by [`ScramClient::handle_server_final`](struct.ScramClient.html#method.handle_server_final).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The server-first message didn't consist of exactly the fields `r=`, `s=` and `i=`, in
    /// that order and each with a value, or wasn't valid Base64/UTF-8.
    #[error("malformed server-first message")]
    MalformedChallenge,
    /// The server-final message didn't start with `v=` followed by a value, or wasn't valid
    /// Base64/UTF-8.
    #[error("malformed server-final message")]
    MalformedVerifier,
    /// The salt wasn't valid Base64.
    #[error("invalid salt")]
    InvalidSalt,
    /// The iteration count wasn't a positive integer.
    #[error("invalid iteration count")]
    InvalidIterationCount,
    /// The server signature wasn't valid Base64.
    #[error("invalid server signature encoding")]
    InvalidSignatureEncoding,
    /// A handshake step was invoked out of order or twice.
    #[error("handshake step invoked in an invalid state")]
    InvalidState,
    /// The server responded with a nonce that doesn't start with our nonce.
    #[error("server nonce doesn't extend the client nonce")]
    NonceMismatch,
    /// A caller supplied client nonce was empty, contained a comma or non-printable characters.
    #[error("invalid client nonce")]
    InvalidNonce,
    /// The requested hash algorithm or mechanism name isn't supported.
    #[error("unsupported mechanism '{0}'")]
    UnsupportedMechanism(String),
    /// A derived value didn't have the digest length of the negotiated algorithm.
    #[error("digest length mismatch: expected {expected} bytes, got {actual}")]
    DigestLength {
        /// Digest length of the algorithm.
        expected: usize,
        /// Length actually produced.
        actual: usize,
    },
    /// The random number generator failed to produce bytes for the nonce.
    #[error("random source failure: {0}")]
    Random(String),
    /// The crypto provider failed.
    #[error("crypto provider failure: {0}")]
    Crypto(String),
}

impl From<rand::Error> for Error {
    fn from(err: rand::Error) -> Self {
        Error::Random(err.to_string())
    }
}
