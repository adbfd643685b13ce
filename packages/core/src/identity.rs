//! User identity: Ed25519 keys and HTTP Signature construction.
//!
//! Hearth does not issue tokens. Each user holds an Ed25519 seed, registers
//! the matching public key with the directory, and signs every authenticated
//! request. This module has no I/O: the host decides where the seed lives and
//! supplies the `Date` header value.
//!
//! # Key encoding
//!
//! Public keys are exchanged in multibase form:
//!
//! ```text
//! z <base58btc( [0xed, 0x01] ++ public_key_bytes )>
//! ```
//!
//! where `[0xed, 0x01]` is the `ed25519-pub` multicodec prefix.
//!
//! # Signature header
//!
//! ```text
//! Signature: keyId="<user id>",algorithm="ed25519",headers="(request-target) host date",signature="z<base58btc>"
//! ```
//!
//! The signed string is built by [`signing_string`].

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// Headers covered by signatures produced by [`sign_request`].
pub const SIGNED_HEADERS: &str = "(request-target) host date";

#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("public key multibase must start with 'z'")]
    MissingMultibasePrefix,
    #[error("base58 decode failed: {0}")]
    Base58(String),
    #[error("missing ed25519 multicodec prefix [0xed, 0x01]")]
    MissingMulticodec,
    #[error("key must be 32 bytes")]
    KeyLength,
    #[error("invalid Ed25519 key: {0}")]
    InvalidKey(String),
    #[error("seed must be 64 hex characters")]
    InvalidSeed,
    #[error("invalid Signature header: {0}")]
    MalformedHeader(String),
    #[error("signature value must start with 'z'")]
    SignaturePrefix,
    #[error("signature must be 64 bytes")]
    SignatureLength,
    #[error("signature verification failed")]
    VerificationFailed,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A user's signing identity.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh identity using OS randomness.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restore an identity from a saved 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Restore an identity from the hex form returned by [`seed_hex`](Self::seed_hex).
    pub fn from_seed_hex(hex_seed: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(hex_seed.trim()).map_err(|_| IdentityError::InvalidSeed)?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| IdentityError::InvalidSeed)?;
        Ok(Self::from_seed(&seed))
    }

    /// The raw seed. **Keep this secret.**
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The seed as lowercase hex, suitable for an environment variable.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed())
    }

    /// The public key in multibase form, as stored on the user record.
    pub fn public_key_multibase(&self) -> String {
        encode_public_key(&self.signing_key.verifying_key())
    }

    /// Sign `message`, returning the `z`-prefixed base58btc signature.
    pub fn sign(&self, message: &[u8]) -> String {
        let sig = self.signing_key.sign(message).to_bytes();
        format!("z{}", bs58::encode(sig).into_string())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key_multibase())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Key encoding
// ---------------------------------------------------------------------------

pub fn encode_public_key(key: &VerifyingKey) -> String {
    let mut prefixed = vec![0xed, 0x01];
    prefixed.extend_from_slice(key.as_bytes());
    format!("z{}", bs58::encode(prefixed).into_string())
}

/// Decode a multibase Ed25519 public key.
pub fn decode_public_key(multibase: &str) -> Result<VerifyingKey, IdentityError> {
    let b58 = multibase
        .strip_prefix('z')
        .ok_or(IdentityError::MissingMultibasePrefix)?;

    let decoded = bs58::decode(b58)
        .into_vec()
        .map_err(|e| IdentityError::Base58(e.to_string()))?;

    if decoded.len() < 2 || decoded[0] != 0xed || decoded[1] != 0x01 {
        return Err(IdentityError::MissingMulticodec);
    }

    let key_bytes: [u8; 32] = decoded[2..]
        .try_into()
        .map_err(|_| IdentityError::KeyLength)?;

    VerifyingKey::from_bytes(&key_bytes).map_err(|e| IdentityError::InvalidKey(e.to_string()))
}

// ---------------------------------------------------------------------------
// HTTP Signatures
// ---------------------------------------------------------------------------

/// The string covered by a signature over [`SIGNED_HEADERS`].
///
/// `method` is lowercased; `path` includes the query string if any.
pub fn signing_string(method: &str, path: &str, host: &str, date: &str) -> String {
    format!(
        "(request-target): {} {path}\nhost: {host}\ndate: {date}",
        method.to_lowercase()
    )
}

/// Build the `Signature` header value for a request.
pub fn sign_request(
    identity: &Identity,
    key_id: &str,
    method: &str,
    path: &str,
    host: &str,
    date: &str,
) -> String {
    let signature = identity.sign(signing_string(method, path, host, date).as_bytes());
    format!(
        r#"keyId="{key_id}",algorithm="ed25519",headers="{SIGNED_HEADERS}",signature="{signature}""#
    )
}

/// A parsed `Signature` header.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSignature {
    pub key_id: String,
    pub algorithm: String,
    pub headers: Vec<String>,
    pub signature: String,
}

/// Parse `keyId="...",algorithm="...",headers="...",signature="z..."`.
pub fn parse_signature_header(header: &str) -> Result<ParsedSignature, IdentityError> {
    let mut key_id = None;
    let mut algorithm = None;
    let mut headers = None;
    let mut signature = None;

    for part in split_params(header) {
        if let Some(rest) = part.strip_prefix("keyId=") {
            key_id = Some(unquote(rest)?);
        } else if let Some(rest) = part.strip_prefix("algorithm=") {
            algorithm = Some(unquote(rest)?);
        } else if let Some(rest) = part.strip_prefix("headers=") {
            let h = unquote(rest)?;
            headers = Some(h.split(' ').map(String::from).collect::<Vec<_>>());
        } else if let Some(rest) = part.strip_prefix("signature=") {
            signature = Some(unquote(rest)?);
        }
    }

    Ok(ParsedSignature {
        key_id: key_id.ok_or_else(|| IdentityError::MalformedHeader("missing keyId".into()))?,
        algorithm: algorithm.unwrap_or_else(|| "ed25519".into()),
        headers: headers.unwrap_or_else(|| vec!["date".into()]),
        signature: signature
            .ok_or_else(|| IdentityError::MalformedHeader("missing signature".into()))?,
    })
}

/// Verify a `z`-prefixed signature over `message`.
pub fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature: &str,
) -> Result<(), IdentityError> {
    let bytes = bs58::decode(signature.strip_prefix('z').ok_or(IdentityError::SignaturePrefix)?)
        .into_vec()
        .map_err(|e| IdentityError::Base58(e.to_string()))?;
    let array: [u8; 64] = bytes.try_into().map_err(|_| IdentityError::SignatureLength)?;
    key.verify(message, &ed25519_dalek::Signature::from_bytes(&array))
        .map_err(|_| IdentityError::VerificationFailed)
}

/// Split header params on commas that sit outside double quotes.
fn split_params(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in s.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn unquote(s: &str) -> Result<String, IdentityError> {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        Ok(s[1..s.len() - 1].to_string())
    } else {
        Err(IdentityError::MalformedHeader(format!(
            "expected quoted string, got: {s:?}"
        )))
    }
}
