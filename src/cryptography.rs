use aes::Aes256;
use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ctr::cipher::{KeyIvInit, StreamCipher};
use sha2::{Digest, Sha256};

use crate::error::LinkError;
use crate::payload::CloudEnvelope;
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// AES-256 in CTR mode with a big-endian 16-byte counter block, matching the
/// counter semantics of the peer firmware.
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Derive a 256-bit key as SHA-256(passphrase). Deterministic by design: the
/// passphrase itself is the secret and is rotated out-of-band.
pub fn derive_key(passphrase: &str) -> [u8; KEY_SIZE] {
    let mut hasher = Sha256::default();
    hasher.update(passphrase.as_bytes());
    hasher.finalize().into()
}

/// Build the initial CTR counter block: 12-byte IV followed by the 4-byte
/// big-endian sequence number. The sequence doubles as the cipher counter's
/// low bytes, so the keystream is unique per (key, sequence) as long as
/// sequence numbers do not repeat.
pub fn counter_block(iv: &[u8; NONCE_SIZE], sequence: u32) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..NONCE_SIZE].copy_from_slice(iv);
    block[NONCE_SIZE..].copy_from_slice(&sequence.to_be_bytes());
    block
}

/// Apply the radio-leg stream cipher in place. Encryption and decryption are
/// the same operation in CTR mode.
pub fn apply_link_cipher(key: &[u8; KEY_SIZE], iv: &[u8; NONCE_SIZE], sequence: u32, data: &mut [u8]) {
    let block = counter_block(iv, sequence);
    let mut cipher = Aes256Ctr::new(key.into(), &block.into());
    cipher.apply_keystream(data);
}

/// Draw a fresh 12-byte nonce from the OS CSPRNG.
pub fn random_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts plaintext for the cloud agent with AES-256-GCM under a key
/// derived from the shared token, producing versioned base64 envelopes.
pub struct RelayEncryptor {
    key: [u8; KEY_SIZE],
}

impl RelayEncryptor {
    pub fn new(token: &str) -> Self {
        RelayEncryptor { key: derive_key(token) }
    }

    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        RelayEncryptor { key }
    }

    /// Encrypt plaintext into a `CloudEnvelope`. A fresh random nonce is drawn
    /// per call; the 16-byte auth tag rides at the end of the AEAD output and
    /// is split into its own envelope field. Any primitive failure aborts the
    /// whole envelope, never partial output.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<CloudEnvelope, LinkError> {
        let iv = random_nonce();

        let cipher = Aes256Gcm::new((&self.key).into());
        let nonce = Nonce::from_slice(&iv);
        let sealed = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| LinkError::Crypto(format!("AEAD encrypt failed: {:?}", e)))?;

        if sealed.len() <= TAG_SIZE {
            return Err(LinkError::Crypto("empty ciphertext".to_string()));
        }
        let (ct, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        Ok(CloudEnvelope {
            v: 1,
            iv: BASE64.encode(iv),
            tag: BASE64.encode(tag),
            ct: BASE64.encode(ct),
        })
    }

    /// Open an envelope produced by `encrypt`. The agent performs the same
    /// operation server-side; kept here so both halves of the contract are
    /// exercised by tests.
    pub fn decrypt(&self, envelope: &CloudEnvelope) -> Result<Vec<u8>, LinkError> {
        if envelope.v != 1 {
            return Err(LinkError::Parse(format!("unsupported envelope version {}", envelope.v)));
        }

        let decode = |field: &str, value: &str| {
            BASE64
                .decode(value)
                .map_err(|e| LinkError::Parse(format!("invalid base64 in '{}': {}", field, e)))
        };
        let iv = decode("iv", &envelope.iv)?;
        let tag = decode("tag", &envelope.tag)?;
        let ct = decode("ct", &envelope.ct)?;

        if iv.len() != NONCE_SIZE {
            return Err(LinkError::Parse(format!("iv must be {} bytes, got {}", NONCE_SIZE, iv.len())));
        }
        if tag.len() != TAG_SIZE {
            return Err(LinkError::Parse(format!("tag must be {} bytes, got {}", TAG_SIZE, tag.len())));
        }

        let mut sealed = ct;
        sealed.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new((&self.key).into());
        cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|e| LinkError::Crypto(format!("AEAD decrypt failed: {:?}", e)))
    }
}
