//! # Salted Challenge Response Authentication Mechanism (SCRAM)
//!
//! This crate provides the client side of SCRAM according to RFC 5802 and RFC 7677, for
//! SCRAM-SHA-1, SCRAM-SHA-256 and SCRAM-SHA-512. It doesn't support channel-binding and doesn't
//! apply SASLprep to usernames or passwords.
//!
//! The crate performs no I/O. It is meant to be embedded in a host protocol (a database, mail or
//! messaging protocol) which transports the messages, so all messages are exchanged Base64
//! encoded.
//!
//! # Usage
//!
//! A [`ScramClient`](struct.ScramClient.html) is constructed from the credentials and computes
//! the client first message right away. The server and the client then exchange their messages
//! and the client reports whether the server could be authenticated. Calling the handlers out of
//! order is an error.
//!
//! ``` rust,no_run
//! use scram_client::{Algorithm, ScramClient};
//!
//! // This function represents your I/O implementation.
//! fn send_and_receive(message: &str) -> String {
//!     unimplemented!()
//! }
//!
//! # fn main() -> Result<(), scram_client::Error> {
//! // Create a SCRAM session from the credentials.
//! let mut scram = ScramClient::new("user", "password", Algorithm::Sha256)?;
//!
//! // Send the client first message and receive the servers reply.
//! let server_first = send_and_receive(&scram.client_first());
//!
//! // Process the reply and compute the client final message.
//! let client_final = scram.handle_server_first(&server_first)?;
//!
//! // Send the client final message and receive the servers reply.
//! let server_final = send_and_receive(&client_final);
//!
//! // `false` means the server couldn't be authenticated.
//! if !scram.handle_server_final(&server_final)? {
//!     panic!("authentication failed");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Sessions log through the `log` facade under the target `scram`. A different logger can be
//! injected per session with [`ClientBuilder::logger`](struct.ClientBuilder.html#method.logger),
//! and the hash, HMAC and PBKDF2 primitives can be replaced by implementing
//! [`CryptoProvider`](trait.CryptoProvider.html).

mod client;
mod crypto;
mod error;
mod logging;
pub mod message;
mod utils;

pub use crate::client::{ClientBuilder, Outcome, ScramClient, State};
pub use crate::crypto::{Algorithm, CryptoProvider, RingProvider};
pub use crate::error::Error;
pub use crate::logging::LOG_TARGET;
pub use crate::utils::{auth_message, find_proofs, generate_nonce, hash_password, salt_password, Proofs};

/// The length of a generated client nonce.
pub const NONCE_LENGTH: usize = 24;
