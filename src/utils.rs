use std::num::NonZeroU32;

use rand::RngCore;

use crate::crypto::{Algorithm, CryptoProvider, RingProvider};
use crate::error::Error;

/// Number of characters in the printable nonce alphabet: `!` (33) through `}` (125) without `,`.
const NONCE_ALPHABET_LEN: u8 = 92;

/// Generates a nonce of `length` printable ASCII characters that never contains a comma.
///
/// Random bytes are mapped onto the alphabet by rejection sampling, so every character is
/// equally likely. Failures of `rng` are returned as [`Error::Random`](enum.Error.html).
pub fn generate_nonce<R: RngCore + ?Sized>(rng: &mut R, length: usize) -> Result<String, Error> {
    let limit = NONCE_ALPHABET_LEN * 2;
    let mut nonce = String::with_capacity(length);
    let mut buf = [0u8; 32];
    while nonce.len() < length {
        rng.try_fill_bytes(&mut buf)?;
        for &byte in buf.iter().filter(|&&byte| byte < limit) {
            if nonce.len() == length {
                break;
            }
            let x = 33 + byte % NONCE_ALPHABET_LEN;
            nonce.push(if x > 43 { (x + 1) as char } else { x as char });
        }
    }
    Ok(nonce)
}

fn check_len(algorithm: Algorithm, value: &[u8]) -> Result<(), Error> {
    let expected = algorithm.digest_len();
    if value.len() == expected {
        Ok(())
    } else {
        Err(Error::DigestLength { expected, actual: value.len() })
    }
}

/// Derives `SaltedPassword` with PBKDF2, using the `ring` backed provider.
///
/// This is the value a server stores for a user, so it can be used to precompute credentials.
pub fn hash_password(
    algorithm: Algorithm,
    password: &str,
    iterations: NonZeroU32,
    salt: &[u8],
) -> Vec<u8> {
    let mut salted_password = vec![0u8; algorithm.digest_len()];
    ring::pbkdf2::derive(
        RingProvider::pbkdf2_algorithm(algorithm),
        iterations,
        salt,
        password.as_bytes(),
        &mut salted_password,
    );
    salted_password
}

/// Derives `SaltedPassword` with the given provider and checks its length.
pub fn salt_password<P: CryptoProvider + ?Sized>(
    provider: &P,
    algorithm: Algorithm,
    password: &str,
    salt: &[u8],
    iterations: NonZeroU32,
) -> Result<Vec<u8>, Error> {
    let salted_password =
        provider.pbkdf2(algorithm, password.as_bytes(), salt, iterations, algorithm.digest_len())?;
    check_len(algorithm, &salted_password)?;
    Ok(salted_password)
}

/// Joins the three signed fragments into `AuthMessage`.
///
/// The fragments must be the literal wire strings: `client-first-message-bare`,
/// `server-first-message` and `client-final-message-without-proof`.
pub fn auth_message(client_first_bare: &str, server_first: &str, client_final_bare: &str) -> String {
    [client_first_bare, server_first, client_final_bare].join(",")
}

/// XORs two digests of the algorithm's length.
fn xor(algorithm: Algorithm, lhs: &[u8], rhs: &[u8]) -> Result<Vec<u8>, Error> {
    check_len(algorithm, lhs)?;
    check_len(algorithm, rhs)?;
    Ok(lhs.iter().zip(rhs).map(|(l, r)| l ^ r).collect())
}

/// Everything derived from `SaltedPassword` and `AuthMessage`.
#[derive(Clone, PartialEq, Eq)]
pub struct Proofs {
    /// `HMAC(SaltedPassword, "Client Key")`
    pub client_key: Vec<u8>,
    /// `HMAC(StoredKey, AuthMessage)`
    pub client_signature: Vec<u8>,
    /// `ClientKey XOR ClientSignature`, sent to the server.
    pub client_proof: Vec<u8>,
    /// `HMAC(ServerKey, AuthMessage)`, expected from the server.
    pub server_signature: Vec<u8>,
}

// Keys stay out of debug output.
impl std::fmt::Debug for Proofs {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Proofs").finish()
    }
}

/// Finds the client proof and server signature based on the salted password.
pub fn find_proofs<P: CryptoProvider + ?Sized>(
    provider: &P,
    algorithm: Algorithm,
    salted_password: &[u8],
    auth_message: &str,
) -> Result<Proofs, Error> {
    check_len(algorithm, salted_password)?;

    let client_key = provider.hmac(algorithm, salted_password, b"Client Key")?;
    check_len(algorithm, &client_key)?;
    let stored_key = provider.hash(algorithm, &client_key)?;
    check_len(algorithm, &stored_key)?;
    let client_signature = provider.hmac(algorithm, &stored_key, auth_message.as_bytes())?;
    let client_proof = xor(algorithm, &client_key, &client_signature)?;

    let server_key = provider.hmac(algorithm, salted_password, b"Server Key")?;
    check_len(algorithm, &server_key)?;
    let server_signature = provider.hmac(algorithm, &server_key, auth_message.as_bytes())?;
    check_len(algorithm, &server_signature)?;

    Ok(Proofs { client_key, client_signature, client_proof, server_signature })
}
