use std::fmt;
use std::mem;

use log::Log;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::constant_time;

use crate::crypto::{Algorithm, CryptoProvider, RingProvider};
use crate::error::Error;
use crate::logging::SessionLog;
use crate::message::{client_final_bare, decode_payload, ClientFinal, ClientFirst, ServerFinal, ServerFirst};
use crate::utils::{auth_message, find_proofs, generate_nonce, salt_password};
use crate::NONCE_LENGTH;

/// The observable state of a [`ScramClient`](struct.ScramClient.html).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// The client first message is available; waiting for the server first message.
    ChallengePending,
    /// The client final message was computed; waiting for the server final message.
    FinalPending,
    /// The server final message was processed.
    Completed(Outcome),
    /// A server message couldn't be processed. The session can't be used anymore.
    Aborted,
}

/// The result of a completed handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The server proved knowledge of the credentials.
    Verified,
    /// The server signature didn't match. The server couldn't be authenticated.
    Rejected,
}

enum Stage {
    ChallengePending,
    FinalPending {
        server_first: ServerFirst,
        server_signature: Vec<u8>,
    },
    Completed(Outcome),
    Aborted,
}

/// Configures and constructs a [`ScramClient`](struct.ScramClient.html).
///
/// ```
/// use scram_client::{Algorithm, ClientBuilder};
///
/// let client = ClientBuilder::new("user", "pencil")
///     .algorithm(Algorithm::Sha1)
///     .nonce("fyko+d2lbbFgONRv9qkxdawL")
///     .build()
///     .unwrap();
/// assert_eq!(client.client_first(), "biwsbj11c2VyLHI9ZnlrbytkMmxiYkZnT05Sdjlxa3hkYXdM");
/// ```
pub struct ClientBuilder<'a, P = RingProvider> {
    username: &'a str,
    password: &'a str,
    algorithm: Algorithm,
    nonce: Option<&'a str>,
    nonce_length: usize,
    provider: P,
    logger: &'a dyn Log,
}

impl<'a> ClientBuilder<'a> {
    /// Starts a configuration for the given credentials.
    ///
    /// Defaults to SCRAM-SHA-256, a generated nonce of [`NONCE_LENGTH`](constant.NONCE_LENGTH.html)
    /// characters, the `ring` crypto provider and the logger installed in the `log` facade.
    pub fn new(username: &'a str, password: &'a str) -> Self {
        ClientBuilder {
            username,
            password,
            algorithm: Algorithm::default(),
            nonce: None,
            nonce_length: NONCE_LENGTH,
            provider: RingProvider,
            logger: log::logger(),
        }
    }
}

impl<'a, P: CryptoProvider> ClientBuilder<'a, P> {
    /// Sets the hash algorithm of the mechanism.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Uses `nonce` instead of generating one. It must be non-empty printable ASCII without a
    /// comma. Only use this for testing or if the nonce comes from a secure source.
    pub fn nonce(mut self, nonce: &'a str) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Sets the length of a generated nonce.
    pub fn nonce_length(mut self, nonce_length: usize) -> Self {
        self.nonce_length = nonce_length;
        self
    }

    /// Sends the session's log records to `logger`.
    pub fn logger(mut self, logger: &'a dyn Log) -> Self {
        self.logger = logger;
        self
    }

    /// Computes keys and signatures with `provider`.
    pub fn provider<Q: CryptoProvider>(self, provider: Q) -> ClientBuilder<'a, Q> {
        ClientBuilder {
            username: self.username,
            password: self.password,
            algorithm: self.algorithm,
            nonce: self.nonce,
            nonce_length: self.nonce_length,
            provider,
            logger: self.logger,
        }
    }

    /// Builds the client, generating a nonce with the operating system's random number generator
    /// if none was supplied.
    pub fn build(self) -> Result<ScramClient<'a, P>, Error> {
        self.build_with_rng(&mut OsRng)
    }

    /// Builds the client, generating a nonce with `rng` if none was supplied. Please only use a
    /// cryptographically secure random number generator!
    pub fn build_with_rng<R: RngCore + ?Sized>(self, rng: &mut R) -> Result<ScramClient<'a, P>, Error> {
        let nonce = match self.nonce {
            Some(nonce) if is_valid_nonce(nonce) => nonce.to_string(),
            Some(_) => return Err(Error::InvalidNonce),
            None if self.nonce_length == 0 => return Err(Error::InvalidNonce),
            None => generate_nonce(rng, self.nonce_length)?,
        };
        let log = SessionLog::new(self.logger);
        log.debug(format_args!(
            "starting {} handshake for user '{}'",
            self.algorithm, self.username
        ));
        Ok(ScramClient {
            password: self.password,
            algorithm: self.algorithm,
            provider: self.provider,
            log,
            client_first: ClientFirst::new(self.username, &nonce),
            client_final: None,
            stage: Stage::ChallengePending,
        })
    }
}

fn is_valid_nonce(nonce: &str) -> bool {
    !nonce.is_empty() && nonce.bytes().all(|b| b.is_ascii_graphic() && b != b',')
}

/// A single SCRAM authentication attempt on the client side.
///
/// The client first message is computed on construction. Afterwards
/// [`handle_server_first`](#method.handle_server_first) and
/// [`handle_server_final`](#method.handle_server_final) must be called exactly once each, in
/// that order. All messages are exchanged Base64 encoded.
pub struct ScramClient<'a, P = RingProvider> {
    password: &'a str,
    algorithm: Algorithm,
    provider: P,
    log: SessionLog<'a>,
    client_first: ClientFirst,
    client_final: Option<ClientFinal>,
    stage: Stage,
}

impl<'a> ScramClient<'a> {
    /// Constructs a client with a nonce from the operating system's random number generator.
    ///
    /// # Arguments
    ///
    /// * username - An username used for authentication.
    /// * password - A password used to prove that the user is authentic.
    /// * algorithm - The hash function of the mechanism.
    ///
    /// # Return value
    ///
    /// `Error::Random` is returned if the random number generator failed.
    pub fn new(username: &'a str, password: &'a str, algorithm: Algorithm) -> Result<Self, Error> {
        ClientBuilder::new(username, password).algorithm(algorithm).build()
    }

    /// Constructs a client with a caller supplied nonce.
    ///
    /// `Error::InvalidNonce` is returned if the nonce is empty, contains a comma or characters
    /// outside of printable ASCII.
    pub fn with_nonce(
        username: &'a str,
        password: &'a str,
        nonce: &'a str,
        algorithm: Algorithm,
    ) -> Result<Self, Error> {
        ClientBuilder::new(username, password).algorithm(algorithm).nonce(nonce).build()
    }
}

impl<'a, P: CryptoProvider> ScramClient<'a, P> {
    /// The current state of the handshake.
    pub fn state(&self) -> State {
        match self.stage {
            Stage::ChallengePending => State::ChallengePending,
            Stage::FinalPending { .. } => State::FinalPending,
            Stage::Completed(outcome) => State::Completed(outcome),
            Stage::Aborted => State::Aborted,
        }
    }

    /// The hash algorithm of the mechanism.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The client nonce.
    pub fn client_nonce(&self) -> &str {
        self.client_first.nonce()
    }

    /// The client first message, Base64 encoded. Send it to the server to start the handshake.
    pub fn client_first(&self) -> String {
        self.client_first.to_base64()
    }

    /// The client first message in plain text.
    pub fn client_first_message(&self) -> &ClientFirst {
        &self.client_first
    }

    /// The client final message, Base64 encoded, once the server first message was handled.
    pub fn client_final(&self) -> Option<String> {
        self.client_final.as_ref().map(ClientFinal::to_base64)
    }

    /// Processes the Base64 encoded server first message and returns the Base64 encoded client
    /// final message to send to the server.
    ///
    /// # Return value
    ///
    /// * `Error::InvalidState` if the server first message was already handled.
    /// * `Error::MalformedChallenge`, `Error::InvalidSalt` or `Error::InvalidIterationCount` if
    /// the message couldn't be parsed.
    /// * Errors of the crypto provider.
    ///
    /// Any error other than `Error::InvalidState` aborts the handshake.
    pub fn handle_server_first(&mut self, server_first: &str) -> Result<String, Error> {
        if !matches!(self.stage, Stage::ChallengePending) {
            return Err(Error::InvalidState);
        }
        self.stage = Stage::Aborted;

        match self.process_server_first(server_first) {
            Ok((server_first, client_final, server_signature)) => {
                let message = client_final.to_base64();
                self.log.debug(format_args!("server first message processed, sending client final message"));
                self.client_final = Some(client_final);
                self.stage = Stage::FinalPending { server_first, server_signature };
                Ok(message)
            }
            Err(err) => {
                self.log.warn(format_args!("handshake aborted: {}", err));
                Err(err)
            }
        }
    }

    fn process_server_first(&self, payload: &str) -> Result<(ServerFirst, ClientFinal, Vec<u8>), Error> {
        let text = decode_payload(payload, Error::MalformedChallenge)?;
        let server_first = ServerFirst::parse(&text)?;
        self.log.trace(format_args!(
            "server first message: {} iterations, {} byte salt",
            server_first.iterations(),
            server_first.salt().len()
        ));
        if !server_first.extends_nonce(self.client_first.nonce()) {
            self.log.warn(format_args!("server nonce doesn't extend the client nonce"));
        }

        let salted_password = salt_password(
            &self.provider,
            self.algorithm,
            self.password,
            server_first.salt(),
            server_first.iterations(),
        )?;
        let client_final_bare = client_final_bare(server_first.nonce());
        let auth_message = auth_message(self.client_first.bare(), server_first.raw(), &client_final_bare);
        let proofs = find_proofs(&self.provider, self.algorithm, &salted_password, &auth_message)?;

        let client_final = ClientFinal::from_bare(client_final_bare, &proofs.client_proof);
        Ok((server_first, client_final, proofs.server_signature))
    }

    /// Processes the Base64 encoded server final message.
    ///
    /// # Return value
    ///
    /// * `Ok(true)` if the server signature matches, the server is authentic.
    /// * `Ok(false)` if the signature doesn't match. The authentication attempt failed, either
    /// because of a wrong password or because the server isn't who it claims to be.
    /// * `Error::InvalidState` if the server first message wasn't handled yet, or the server
    /// final message was already handled.
    /// * `Error::MalformedVerifier` or `Error::InvalidSignatureEncoding` if the message couldn't
    /// be parsed.
    /// * `Error::NonceMismatch` if the nonce of the server first message didn't start with the
    /// client nonce, regardless of the signature.
    pub fn handle_server_final(&mut self, server_final: &str) -> Result<bool, Error> {
        let (server_first, server_signature) = match mem::replace(&mut self.stage, Stage::Aborted) {
            Stage::FinalPending { server_first, server_signature } => (server_first, server_signature),
            stage => {
                self.stage = stage;
                return Err(Error::InvalidState);
            }
        };

        match self.verify_server_final(&server_first, &server_signature, server_final) {
            Ok(true) => {
                self.log.info(format_args!("server signature verified"));
                self.stage = Stage::Completed(Outcome::Verified);
                Ok(true)
            }
            Ok(false) => {
                self.log.warn(format_args!("server signature rejected"));
                self.stage = Stage::Completed(Outcome::Rejected);
                Ok(false)
            }
            Err(err) => {
                self.log.warn(format_args!("handshake aborted: {}", err));
                Err(err)
            }
        }
    }

    fn verify_server_final(
        &self,
        server_first: &ServerFirst,
        expected: &[u8],
        payload: &str,
    ) -> Result<bool, Error> {
        let text = decode_payload(payload, Error::MalformedVerifier)?;
        let server_final = ServerFinal::parse(&text)?;
        if !server_first.extends_nonce(self.client_first.nonce()) {
            return Err(Error::NonceMismatch);
        }
        Ok(constant_time::verify_slices_are_equal(expected, server_final.signature()).is_ok())
    }
}

impl<'a, P> fmt::Debug for ScramClient<'a, P> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("ScramClient")
            .field("algorithm", &self.algorithm)
            .field("username", &self.client_first.username())
            .field("password", &"<redacted>")
            .field("nonce", &self.client_first.nonce())
            .finish()
    }
}
