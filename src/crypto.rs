use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use ring::{digest, hmac, pbkdf2};

use crate::error::Error;

/// The hash functions a SCRAM mechanism can be built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// SCRAM-SHA-1 (RFC 5802)
    Sha1,
    /// SCRAM-SHA-256 (RFC 7677)
    Sha256,
    /// SCRAM-SHA-512
    Sha512,
}

impl Algorithm {
    /// Output length of the hash function in bytes. Every key, signature and proof of the
    /// mechanism has exactly this length.
    pub fn digest_len(self) -> usize {
        match self {
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
            Algorithm::Sha512 => 64,
        }
    }

    /// The SASL mechanism name, e.g. `SCRAM-SHA-256`.
    pub fn mechanism_name(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SCRAM-SHA-1",
            Algorithm::Sha256 => "SCRAM-SHA-256",
            Algorithm::Sha512 => "SCRAM-SHA-512",
        }
    }

    fn hash_name(self) -> &'static str {
        &self.mechanism_name()["SCRAM-".len()..]
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Sha256
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.mechanism_name())
    }
}

/// Accepts both mechanism names (`SCRAM-SHA-1`) and hash names (`SHA-1`, `sha1`), ignoring case.
impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let upper = s.to_ascii_uppercase();
        let name = upper.strip_prefix("SCRAM-").unwrap_or(upper.as_str());
        match name {
            "SHA-1" | "SHA1" => Ok(Algorithm::Sha1),
            "SHA-256" | "SHA256" => Ok(Algorithm::Sha256),
            "SHA-512" | "SHA512" => Ok(Algorithm::Sha512),
            _ => Err(Error::UnsupportedMechanism(s.to_string())),
        }
    }
}

/// The cryptographic primitives the key derivation chain is computed with.
///
/// HMAC is not symmetric in its operands: `key` is always the secret (salted password, stored
/// key or server key) and `message` the data being authenticated.
///
/// Implementations report their own failures as [`Error::Crypto`](enum.Error.html). The output
/// lengths are checked by the caller against [`Algorithm::digest_len`].
pub trait CryptoProvider {
    /// Computes `HMAC(key, message)`.
    fn hmac(&self, algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, Error>;

    /// Computes `H(message)`.
    fn hash(&self, algorithm: Algorithm, message: &[u8]) -> Result<Vec<u8>, Error>;

    /// Computes `PBKDF2(HMAC, password, salt, iterations)` with `output_len` bytes of output.
    fn pbkdf2(
        &self,
        algorithm: Algorithm,
        password: &[u8],
        salt: &[u8],
        iterations: NonZeroU32,
        output_len: usize,
    ) -> Result<Vec<u8>, Error>;
}

impl<'a, P: CryptoProvider + ?Sized> CryptoProvider for &'a P {
    fn hmac(&self, algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, Error> {
        (**self).hmac(algorithm, key, message)
    }

    fn hash(&self, algorithm: Algorithm, message: &[u8]) -> Result<Vec<u8>, Error> {
        (**self).hash(algorithm, message)
    }

    fn pbkdf2(
        &self,
        algorithm: Algorithm,
        password: &[u8],
        salt: &[u8],
        iterations: NonZeroU32,
        output_len: usize,
    ) -> Result<Vec<u8>, Error> {
        (**self).pbkdf2(algorithm, password, salt, iterations, output_len)
    }
}

/// The default [`CryptoProvider`](trait.CryptoProvider.html), backed by `ring`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RingProvider;

impl RingProvider {
    fn digest_algorithm(algorithm: Algorithm) -> &'static digest::Algorithm {
        match algorithm {
            Algorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Algorithm::Sha256 => &digest::SHA256,
            Algorithm::Sha512 => &digest::SHA512,
        }
    }

    fn hmac_algorithm(algorithm: Algorithm) -> hmac::Algorithm {
        match algorithm {
            Algorithm::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Algorithm::Sha256 => hmac::HMAC_SHA256,
            Algorithm::Sha512 => hmac::HMAC_SHA512,
        }
    }

    pub(crate) fn pbkdf2_algorithm(algorithm: Algorithm) -> pbkdf2::Algorithm {
        match algorithm {
            Algorithm::Sha1 => pbkdf2::PBKDF2_HMAC_SHA1,
            Algorithm::Sha256 => pbkdf2::PBKDF2_HMAC_SHA256,
            Algorithm::Sha512 => pbkdf2::PBKDF2_HMAC_SHA512,
        }
    }
}

impl CryptoProvider for RingProvider {
    fn hmac(&self, algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, Error> {
        let key = hmac::Key::new(Self::hmac_algorithm(algorithm), key);
        Ok(hmac::sign(&key, message).as_ref().to_vec())
    }

    fn hash(&self, algorithm: Algorithm, message: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(digest::digest(Self::digest_algorithm(algorithm), message).as_ref().to_vec())
    }

    fn pbkdf2(
        &self,
        algorithm: Algorithm,
        password: &[u8],
        salt: &[u8],
        iterations: NonZeroU32,
        output_len: usize,
    ) -> Result<Vec<u8>, Error> {
        if output_len == 0 {
            return Err(Error::Crypto(format!(
                "PBKDF2-HMAC-{} output length must not be zero",
                algorithm.hash_name()
            )));
        }
        let mut out = vec![0u8; output_len];
        pbkdf2::derive(Self::pbkdf2_algorithm(algorithm), iterations, salt, password, &mut out);
        Ok(out)
    }
}
