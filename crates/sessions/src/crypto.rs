//! Authenticated encryption for stored records.
//!
//! Key: HMAC-SHA256(fixed salt, process secret), 32 bytes. Blob layout:
//! `base64(nonce ‖ auth-tag ‖ ciphertext)` with a fresh random nonce
//! per write.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use da_domain::error::{Error, Result};

/// Domain-separation salt for key derivation. Changing it invalidates
/// every stored blob.
const KEY_SALT: &[u8] = b"debate-arena/session-store/v1";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Minimum length for the process secret.
pub const MIN_SECRET_LEN: usize = 32;

pub struct SessionCrypto {
    cipher: Aes256Gcm,
    /// Short key fingerprint for startup logs; never the key itself.
    fingerprint: String,
}

impl SessionCrypto {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Crypto(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(KEY_SALT)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        mac.update(secret.as_bytes());
        let key = mac.finalize().into_bytes();

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        let fingerprint = hex::encode(&Sha256::digest(&key)[..4]);

        Ok(Self {
            cipher,
            fingerprint,
        })
    }

    /// Hex fingerprint of the derived key, safe to log.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encrypt a plaintext into the storable blob form.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag to the ciphertext; the blob layout
        // wants nonce ‖ tag ‖ ciphertext, so split and reorder.
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| Error::Crypto("encryption failed".into()))?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut blob = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);

        Ok(BASE64.encode(blob))
    }

    /// Decrypt a stored blob back into its plaintext.
    pub fn open(&self, blob: &str) -> Result<Vec<u8>> {
        let raw = BASE64
            .decode(blob)
            .map_err(|e| Error::Crypto(format!("blob is not valid base64: {e}")))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Crypto("blob too short".into()));
        }

        let (nonce_bytes, rest) = raw.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed.as_slice())
            .map_err(|_| Error::Crypto("decryption failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "an-adequately-long-process-secret-value";

    #[test]
    fn short_secret_is_rejected() {
        assert!(SessionCrypto::new("short").is_err());
    }

    #[test]
    fn seal_open_round_trip_is_identity() {
        let crypto = SessionCrypto::new(SECRET).unwrap();
        let plaintext = br#"{"id":"db_AAAAAAAAAAAAAAAA","topic":"..."}"#;
        let blob = crypto.seal(plaintext).unwrap();
        assert_eq!(crypto.open(&blob).unwrap(), plaintext);
    }

    #[test]
    fn nonces_differ_per_write() {
        let crypto = SessionCrypto::new(SECRET).unwrap();
        let a = crypto.seal(b"same plaintext").unwrap();
        let b = crypto.seal(b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_blob_fails_to_open() {
        let crypto = SessionCrypto::new(SECRET).unwrap();
        let blob = crypto.seal(b"payload").unwrap();

        let mut raw = BASE64.decode(&blob).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);

        assert!(crypto.open(&tampered).is_err());
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let a = SessionCrypto::new(SECRET).unwrap();
        let b = SessionCrypto::new("a-completely-different-32-byte-secret!!").unwrap();
        let blob = a.seal(b"payload").unwrap();
        assert!(b.open(&blob).is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = SessionCrypto::new(SECRET).unwrap();
        let b = SessionCrypto::new(SECRET).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 8);
    }
}
