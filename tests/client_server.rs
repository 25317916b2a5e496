use std::cell::RefCell;
use std::num::NonZeroU32;

use scram_client::*;

fn encode(text: &str) -> String {
    base64::encode(text.as_bytes())
}

fn decode(payload: &str) -> String {
    String::from_utf8(base64::decode(payload).unwrap()).unwrap()
}

/// A minimal verifier holding the salted password of a single user.
struct TestServer {
    algorithm: Algorithm,
    salted_password: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
    nonce_suffix: &'static str,
}

/// What the server remembers between its two messages.
struct Exchange {
    client_first_bare: String,
    server_first: String,
}

impl TestServer {
    fn new(algorithm: Algorithm, password: &str) -> Self {
        let iterations = 4096;
        let salt = b"messy salt".to_vec();
        TestServer {
            algorithm,
            salted_password: hash_password(algorithm, password, NonZeroU32::new(iterations).unwrap(), &salt),
            salt,
            iterations,
            nonce_suffix: "3rfcNHYJY1ZVvWVs7j",
        }
    }

    fn server_first(&self, client_first: &str) -> (Exchange, String) {
        let client_first = decode(client_first);
        let client_first_bare = client_first.strip_prefix("n,,").unwrap().to_string();
        let client_nonce = client_first_bare.split(",r=").nth(1).unwrap();
        let nonce = format!("{}{}", client_nonce, self.nonce_suffix);
        self.server_first_with_nonce(client_first_bare.clone(), &nonce)
    }

    fn server_first_with_nonce(&self, client_first_bare: String, nonce: &str) -> (Exchange, String) {
        let server_first = format!("r={},s={},i={}", nonce, base64::encode(&self.salt), self.iterations);
        let message = encode(&server_first);
        (Exchange { client_first_bare, server_first }, message)
    }

    fn server_final(&self, exchange: &Exchange, client_final: &str) -> String {
        let client_final = decode(client_final);
        let split = client_final.rfind(",p=").unwrap();
        let (bare, proof) = (&client_final[..split], &client_final[split + 3..]);
        let auth_message = auth_message(&exchange.client_first_bare, &exchange.server_first, bare);
        let proofs = find_proofs(&RingProvider, self.algorithm, &self.salted_password, &auth_message).unwrap();
        if base64::decode(proof).unwrap() == proofs.client_proof {
            encode(&format!("v={}", base64::encode(&proofs.server_signature)))
        } else {
            encode("e=invalid-proof")
        }
    }
}

#[test]
fn test_rfc5802_sha1_vector() {
    let mut client =
        ScramClient::with_nonce("user", "pencil", "fyko+d2lbbFgONRv9qkxdawL", Algorithm::Sha1).unwrap();
    assert_eq!(decode(&client.client_first()), "n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL");

    let client_final = client
        .handle_server_first("cj1meWtvK2QybGJiRmdPTlJ2OXFreGRhd0wzcmZjTkhZSlkxWlZ2V1ZzN2oscz1RU1hDUitRNnNlazhiZjkyLGk9NDA5Ng==")
        .unwrap();
    assert_eq!(
        decode(&client_final),
        "c=biws,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts="
    );
    assert!(client.handle_server_final("dj1ybUY5cHFWOFM3c3VBb1pXamE0ZEpSa0ZzS1E9").unwrap());
    assert_eq!(client.state(), State::Completed(Outcome::Verified));
}

#[test]
fn test_rfc5802_sha1_vector_wrong_password() {
    let mut client =
        ScramClient::with_nonce("user", "pencil1", "fyko+d2lbbFgONRv9qkxdawL", Algorithm::Sha1).unwrap();
    client
        .handle_server_first("cj1meWtvK2QybGJiRmdPTlJ2OXFreGRhd0wzcmZjTkhZSlkxWlZ2V1ZzN2oscz1RU1hDUitRNnNlazhiZjkyLGk9NDA5Ng==")
        .unwrap();
    assert!(!client.handle_server_final("dj1ybUY5cHFWOFM3c3VBb1pXamE0ZEpSa0ZzS1E9").unwrap());
    assert_eq!(client.state(), State::Completed(Outcome::Rejected));
}

#[test]
fn test_rfc7677_sha256_vector() {
    let server_first = "cj1yT3ByTkdmd0ViZVJXZ2JORWtxTyVodllEcFdVYTJSYVRDQWZ1eEZJbGopaE5sRiRrMCxzPVcyMlphSjBTTlk3c29Fc1VFamI2Z1E9PSxpPTQwOTY=";
    let server_final = "dj02cnJpVFJCaTIzV3BSUi93dHVwK21NaFVaVW4vZEI1bkxUSlJzamw5NUc0PQ==";

    let mut client =
        ScramClient::with_nonce("user", "pencil", "rOprNGfwEbeRWgbNEkqO", Algorithm::Sha256).unwrap();
    let client_final = client.handle_server_first(server_first).unwrap();
    assert_eq!(
        decode(&client_final),
        "c=biws,r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,p=dHzbZapWIk4jUhN+Ute9ytag9zjfMHgsqmmiz7AndVQ="
    );
    assert!(client.handle_server_final(server_final).unwrap());

    let mut client =
        ScramClient::with_nonce("user", "pencil1", "rOprNGfwEbeRWgbNEkqO", Algorithm::Sha256).unwrap();
    client.handle_server_first(server_first).unwrap();
    assert!(!client.handle_server_final(server_final).unwrap());
}

#[test]
fn test_sha512_vector() {
    let mut client =
        ScramClient::with_nonce("user", "pencil", "rOprNGfwEbeRWgbNEkqO", Algorithm::Sha512).unwrap();
    let client_final = client
        .handle_server_first(&encode(
            "r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096",
        ))
        .unwrap();
    assert_eq!(
        decode(&client_final),
        "c=biws,r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,\
         p=gMGXRcevScNtxZ6/8lQYpGtnsNAc3mGcmNomv+xnoOMw+3R2xNJdMNnzMlTN8PPC6wdp6dybEmDYXYTxwnYPJQ=="
    );
    assert!(client
        .handle_server_final(&encode(
            "v=ZQnYEgWQMFmmsM8aQMF0nDDCy/AgCzkwk8CmMZYcMg0vSVlKDanekLtifDSeVGT4+5ZxXnJq199RVG2rR7N7Zw=="
        ))
        .unwrap());
}

#[test]
fn test_simple_success() {
    for &algorithm in &[Algorithm::Sha1, Algorithm::Sha256, Algorithm::Sha512] {
        let server = TestServer::new(algorithm, "password");
        let mut client = ScramClient::new("user", "password", algorithm).unwrap();

        let (exchange, server_first) = server.server_first(&client.client_first());
        let client_final = client.handle_server_first(&server_first).unwrap();
        let server_final = server.server_final(&exchange, &client_final);

        assert!(client.handle_server_final(&server_final).unwrap(), "{}", algorithm);
    }
}

#[test]
fn test_bad_password() {
    let server = TestServer::new(Algorithm::Sha256, "password");
    let mut client = ScramClient::new("user", "badpassword", Algorithm::Sha256).unwrap();

    let (exchange, server_first) = server.server_first(&client.client_first());
    let client_final = client.handle_server_first(&server_first).unwrap();
    let server_final = server.server_final(&exchange, &client_final);

    assert_eq!(decode(&server_final), "e=invalid-proof");
    assert_eq!(client.handle_server_final(&server_final).unwrap_err(), Error::MalformedVerifier);
    assert_eq!(client.state(), State::Aborted);
}

#[test]
fn test_impersonating_server() {
    // The server doesn't know the password and signs with a guess.
    let server = TestServer::new(Algorithm::Sha256, "guess");
    let mut client = ScramClient::new("user", "password", Algorithm::Sha256).unwrap();

    let (exchange, server_first) = server.server_first(&client.client_first());
    let client_final = client.handle_server_first(&server_first).unwrap();
    let client_final = decode(&client_final);
    let client_final_bare = &client_final[..client_final.rfind(",p=").unwrap()];
    let auth_message = auth_message(&exchange.client_first_bare, &exchange.server_first, client_final_bare);
    let proofs = find_proofs(&RingProvider, Algorithm::Sha256, &server.salted_password, &auth_message).unwrap();
    let server_final = encode(&format!("v={}", base64::encode(&proofs.server_signature)));

    assert!(!client.handle_server_final(&server_final).unwrap());
}

#[test]
fn test_empty_password() {
    let server = TestServer::new(Algorithm::Sha1, "");
    let mut client = ScramClient::new("user", "", Algorithm::Sha1).unwrap();

    let (exchange, server_first) = server.server_first(&client.client_first());
    let client_final = client.handle_server_first(&server_first).unwrap();
    let server_final = server.server_final(&exchange, &client_final);

    assert!(client.handle_server_final(&server_final).unwrap());
}

#[test]
fn test_nonce_mismatch() {
    let server = TestServer::new(Algorithm::Sha256, "password");
    let mut client = ScramClient::new("user", "password", Algorithm::Sha256).unwrap();

    let client_first_bare = decode(&client.client_first())[3..].to_string();
    let (exchange, server_first) = server.server_first_with_nonce(client_first_bare, "someoneelsesnonce");
    let client_final = client.handle_server_first(&server_first).unwrap();
    let server_final = server.server_final(&exchange, &client_final);

    // The signature is valid for the exchanged messages.
    assert!(decode(&server_final).starts_with("v="));
    assert_eq!(client.handle_server_final(&server_final).unwrap_err(), Error::NonceMismatch);
    assert_eq!(client.state(), State::Aborted);
}

#[test]
fn test_final_before_first() {
    let mut client = ScramClient::new("user", "password", Algorithm::Sha256).unwrap();
    assert_eq!(
        client.handle_server_final("dj1ybUY5cHFWOFM3c3VBb1pXamE0ZEpSa0ZzS1E9").unwrap_err(),
        Error::InvalidState
    );
}

#[test]
fn test_malformed_server_first() {
    let cases: &[(&str, Error)] = &[
        ("r=fyko+d2lbbFgONRv9qkxdawL3rfc,s=QSXCR+Q6sek8bf92", Error::MalformedChallenge),
        ("s=QSXCR+Q6sek8bf92,r=fyko+d2lbbFgONRv9qkxdawL3rfc,i=4096", Error::MalformedChallenge),
        ("i=4096,s=QSXCR+Q6sek8bf92,r=fyko+d2lbbFgONRv9qkxdawL3rfc", Error::MalformedChallenge),
        ("r=fyko+d2lbbFgONRv9qkxdawL3rfc,s=QSXCR+Q6sek8bf92,i=0", Error::InvalidIterationCount),
        ("r=fyko+d2lbbFgONRv9qkxdawL3rfc,s=QSXCR+Q6sek8bf92,i=-4096", Error::InvalidIterationCount),
        ("r=fyko+d2lbbFgONRv9qkxdawL3rfc,s=*salt*,i=4096", Error::InvalidSalt),
    ];
    for (server_first, expected) in cases {
        let mut client =
            ScramClient::with_nonce("user", "pencil", "fyko+d2lbbFgONRv9qkxdawL", Algorithm::Sha1).unwrap();
        assert_eq!(&client.handle_server_first(&encode(server_first)).unwrap_err(), expected, "{}", server_first);
    }
}

#[test]
fn test_malformed_server_final() {
    let cases: &[(&str, Error)] = &[
        ("v=", Error::MalformedVerifier),
        ("rmF9pqV8S7suAoZWja4dJRkFsKQ=", Error::MalformedVerifier),
        ("v=*signature*", Error::InvalidSignatureEncoding),
    ];
    for (server_final, expected) in cases {
        let mut client =
            ScramClient::with_nonce("user", "pencil", "fyko+d2lbbFgONRv9qkxdawL", Algorithm::Sha1).unwrap();
        client
            .handle_server_first("cj1meWtvK2QybGJiRmdPTlJ2OXFreGRhd0wzcmZjTkhZSlkxWlZ2V1ZzN2oscz1RU1hDUitRNnNlazhiZjkyLGk9NDA5Ng==")
            .unwrap();
        assert_eq!(&client.handle_server_final(&encode(server_final)).unwrap_err(), expected, "{}", server_final);
    }
}

/// Records the order of primitive calls and forwards them to `ring`.
#[derive(Default)]
struct RecordingProvider {
    calls: RefCell<Vec<String>>,
}

impl CryptoProvider for RecordingProvider {
    fn hmac(&self, algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, Error> {
        let message_name = match message {
            b"Client Key" | b"Server Key" => String::from_utf8(message.to_vec()).unwrap(),
            _ => "AuthMessage".to_string(),
        };
        self.calls.borrow_mut().push(format!("hmac({} byte key, {})", key.len(), message_name));
        RingProvider.hmac(algorithm, key, message)
    }

    fn hash(&self, algorithm: Algorithm, message: &[u8]) -> Result<Vec<u8>, Error> {
        self.calls.borrow_mut().push("hash".to_string());
        RingProvider.hash(algorithm, message)
    }

    fn pbkdf2(
        &self,
        algorithm: Algorithm,
        password: &[u8],
        salt: &[u8],
        iterations: NonZeroU32,
        output_len: usize,
    ) -> Result<Vec<u8>, Error> {
        self.calls.borrow_mut().push(format!("pbkdf2({}, {})", iterations, output_len));
        RingProvider.pbkdf2(algorithm, password, salt, iterations, output_len)
    }
}

#[test]
fn test_custom_provider() {
    let provider = RecordingProvider::default();
    let mut client = ClientBuilder::new("user", "pencil")
        .algorithm(Algorithm::Sha1)
        .nonce("fyko+d2lbbFgONRv9qkxdawL")
        .provider(&provider)
        .build()
        .unwrap();
    client
        .handle_server_first("cj1meWtvK2QybGJiRmdPTlJ2OXFreGRhd0wzcmZjTkhZSlkxWlZ2V1ZzN2oscz1RU1hDUitRNnNlazhiZjkyLGk9NDA5Ng==")
        .unwrap();
    assert!(client.handle_server_final("dj1ybUY5cHFWOFM3c3VBb1pXamE0ZEpSa0ZzS1E9").unwrap());

    assert_eq!(
        *provider.calls.borrow(),
        vec![
            "pbkdf2(4096, 20)",
            "hmac(20 byte key, Client Key)",
            "hash",
            "hmac(20 byte key, AuthMessage)",
            "hmac(20 byte key, Server Key)",
            "hmac(20 byte key, AuthMessage)",
        ]
    );
}

/// Truncates HMAC output, or fails it outright.
struct BrokenProvider {
    truncate: bool,
}

impl CryptoProvider for BrokenProvider {
    fn hmac(&self, algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, Error> {
        if !self.truncate {
            return Err(Error::Crypto("hmac unavailable".to_string()));
        }
        let mut mac = RingProvider.hmac(algorithm, key, message)?;
        mac.truncate(16);
        Ok(mac)
    }

    fn hash(&self, algorithm: Algorithm, message: &[u8]) -> Result<Vec<u8>, Error> {
        RingProvider.hash(algorithm, message)
    }

    fn pbkdf2(
        &self,
        algorithm: Algorithm,
        password: &[u8],
        salt: &[u8],
        iterations: NonZeroU32,
        output_len: usize,
    ) -> Result<Vec<u8>, Error> {
        RingProvider.pbkdf2(algorithm, password, salt, iterations, output_len)
    }
}

#[test]
fn test_provider_failures() {
    let cases = [
        (true, Error::DigestLength { expected: 32, actual: 16 }),
        (false, Error::Crypto("hmac unavailable".to_string())),
    ];
    for (truncate, expected) in cases.iter().cloned() {
        let mut client = ClientBuilder::new("user", "pencil")
            .algorithm(Algorithm::Sha256)
            .provider(BrokenProvider { truncate })
            .build()
            .unwrap();
        let server_first = encode(&format!("r={}abc,s=QSXCR+Q6sek8bf92,i=1", client.client_nonce()));
        assert_eq!(client.handle_server_first(&server_first).unwrap_err(), expected);
        assert_eq!(client.state(), State::Aborted);
    }
}

#[test]
fn test_rng_failure() {
    struct Broken;

    impl rand::RngCore for Broken {
        fn next_u32(&mut self) -> u32 {
            unimplemented!()
        }
        fn next_u64(&mut self) -> u64 {
            unimplemented!()
        }
        fn fill_bytes(&mut self, _: &mut [u8]) {
            unimplemented!()
        }
        fn try_fill_bytes(&mut self, _: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(std::io::ErrorKind::Other, "entropy exhausted")))
        }
    }

    match ClientBuilder::new("user", "pencil").build_with_rng(&mut Broken) {
        Err(Error::Random(msg)) => assert!(msg.contains("entropy exhausted")),
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }

    // A supplied nonce doesn't touch the random number generator.
    assert!(ClientBuilder::new("user", "pencil").nonce("abc").build_with_rng(&mut Broken).is_ok());
}
