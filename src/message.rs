//! Construction and parsing of the four SCRAM messages.
//!
//! Every message keeps the exact text that was sent or received, because the signatures are
//! computed over those literal bytes.

use std::num::NonZeroU32;

use crate::error::Error;

/// The gs2 header of a client that doesn't support channel binding and sends no authzid.
pub const GS2_HEADER: &str = "n,,";

/// `c=` attribute of the client final message: the Base64 encoded gs2 header `n,,`.
pub const CHANNEL_BINDING: &str = "c=biws";

/// Checks that the next part of a message split on commas starts with `$key` and carries a
/// value, returning the value. Returns `$err` otherwise.
macro_rules! parse_part {
    ($iter: expr, $key: expr, $err: expr) => {
        match $iter.next() {
            Some(part) => match part.strip_prefix($key) {
                Some(value) if !value.is_empty() => value,
                _ => return Err($err),
            },
            None => return Err($err),
        }
    };
}

/// Decodes a Base64 payload received from the host protocol into message text. Returns `err`
/// if the payload isn't Base64 or the decoded bytes aren't UTF-8.
pub(crate) fn decode_payload(payload: &str, err: Error) -> Result<String, Error> {
    let bytes = base64::decode(payload.as_bytes()).map_err(|_| err.clone())?;
    String::from_utf8(bytes).map_err(|_| err)
}

/// The client's first message, `n,,n=<username>,r=<nonce>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientFirst {
    username: String,
    nonce: String,
    message: String,
}

impl ClientFirst {
    /// Builds the message. The username is sent as is, without SASLprep or escaping.
    pub fn new(username: &str, nonce: &str) -> Self {
        let message = format!("{}n={},r={}", GS2_HEADER, username, nonce);
        ClientFirst {
            username: username.to_string(),
            nonce: nonce.to_string(),
            message,
        }
    }

    /// The username (authcid).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The client nonce.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// The gs2 header, always `n,,`.
    pub fn gs2_header(&self) -> &str {
        GS2_HEADER
    }

    /// `client-first-message-bare`: the message without the gs2 header.
    pub fn bare(&self) -> &str {
        &self.message[GS2_HEADER.len()..]
    }

    /// The full message as sent on the wire.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The full message, Base64 encoded for the host protocol.
    pub fn to_base64(&self) -> String {
        base64::encode(self.message.as_bytes())
    }
}

/// The server's first message, `r=<nonce>,s=<salt>,i=<iterations>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerFirst {
    nonce_len: usize,
    salt: Vec<u8>,
    iterations: NonZeroU32,
    raw: String,
}

impl ServerFirst {
    /// Parses a `server-first-message`.
    ///
    /// All three fields are checked for presence and order before the salt and the iteration
    /// count are decoded. Mandatory extensions (`m=`) aren't supported and are rejected as
    /// malformed, as are any additional fields.
    pub fn parse(data: &str) -> Result<Self, Error> {
        let mut parts = data.split(',');
        let nonce = parse_part!(parts, "r=", Error::MalformedChallenge);
        let salt = parse_part!(parts, "s=", Error::MalformedChallenge);
        let iterations = parse_part!(parts, "i=", Error::MalformedChallenge);
        if parts.next().is_some() {
            return Err(Error::MalformedChallenge);
        }

        let salt = base64::decode(salt.as_bytes()).map_err(|_| Error::InvalidSalt)?;
        let iterations = iterations
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(Error::InvalidIterationCount)?;

        Ok(ServerFirst {
            nonce_len: nonce.len(),
            salt,
            iterations,
            raw: data.to_string(),
        })
    }

    /// The combined nonce chosen by the server.
    pub fn nonce(&self) -> &str {
        &self.raw[2..2 + self.nonce_len]
    }

    /// The decoded salt.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The PBKDF2 iteration count.
    pub fn iterations(&self) -> NonZeroU32 {
        self.iterations
    }

    /// The message exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the server nonce starts with `client_nonce`, as RFC 5802 requires.
    pub fn extends_nonce(&self, client_nonce: &str) -> bool {
        self.nonce().starts_with(client_nonce)
    }
}

/// Returns `client-final-message-without-proof`, `c=biws,r=<nonce>`.
pub fn client_final_bare(server_nonce: &str) -> String {
    format!("{},r={}", CHANNEL_BINDING, server_nonce)
}

/// The client's final message, `c=biws,r=<nonce>,p=<proof>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientFinal {
    bare_len: usize,
    message: String,
}

impl ClientFinal {
    /// Builds the message echoing `server_nonce` and carrying `proof`.
    pub fn new(server_nonce: &str, proof: &[u8]) -> Self {
        Self::from_bare(client_final_bare(server_nonce), proof)
    }

    /// Appends the proof to an already built `client-final-message-without-proof`.
    pub(crate) fn from_bare(bare: String, proof: &[u8]) -> Self {
        let bare_len = bare.len();
        let mut message = bare;
        message.push_str(",p=");
        message.push_str(&base64::encode(proof));
        ClientFinal { bare_len, message }
    }

    /// `client-final-message-without-proof`, the signed part of the message.
    pub fn bare(&self) -> &str {
        &self.message[..self.bare_len]
    }

    /// The full message as sent on the wire.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The full message, Base64 encoded for the host protocol.
    pub fn to_base64(&self) -> String {
        base64::encode(self.message.as_bytes())
    }
}

/// The server's final message, `v=<signature>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerFinal {
    signature: Vec<u8>,
}

impl ServerFinal {
    /// Parses a `server-final-message` carrying a verifier.
    pub fn parse(data: &str) -> Result<Self, Error> {
        let verifier = match data.strip_prefix("v=") {
            Some(verifier) if !verifier.is_empty() => verifier,
            _ => return Err(Error::MalformedVerifier),
        };
        let signature =
            base64::decode(verifier.as_bytes()).map_err(|_| Error::InvalidSignatureEncoding)?;
        Ok(ServerFinal { signature })
    }

    /// The decoded server signature.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}
