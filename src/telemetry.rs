//! Telemetry packet codec for the radio leg.
//!
//! Wire format (minimum total length 19 bytes):
//! ```text
//! [0]      version (0x01)
//! [1..5]   sequence, big-endian u32
//! [5..17]  IV, 12 random bytes
//! [17..19] ciphertext length, big-endian u16
//! [19..]   ciphertext
//! ```
//!
//! The payload is encrypted with AES-256-CTR under the pre-shared link key;
//! the counter block is IV || BE32(sequence). This leg carries no auth tag:
//! the stream cipher provides confidentiality only, and the caller is expected
//! to treat the recovered text as untrusted input (see DESIGN.md).

use crate::cryptography::{apply_link_cipher, random_nonce};
use crate::error::LinkError;
use crate::{KEY_SIZE, NONCE_SIZE, PROTOCOL_VERSION, TELEMETRY_HEADER_SIZE};

/// Plaintext recovered from a telemetry packet, paired with its originating
/// sequence number for ordering or duplicate detection by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedPayload {
    pub text: String,
    pub sequence: u32,
}

/// Decode and decrypt a raw telemetry packet.
///
/// Header or length violations yield `MalformedPacket` and never read past
/// the end of the buffer. The plaintext must be valid UTF-8 (it is JSON by
/// contract with the sender).
pub fn decode_packet(key: &[u8; KEY_SIZE], raw: &[u8]) -> Result<DecryptedPayload, LinkError> {
    if raw.len() < TELEMETRY_HEADER_SIZE {
        return Err(LinkError::MalformedPacket("packet shorter than header"));
    }
    if raw[0] != PROTOCOL_VERSION {
        return Err(LinkError::MalformedPacket("unknown protocol version"));
    }

    let sequence = u32::from_be_bytes([raw[1], raw[2], raw[3], raw[4]]);
    let length = u16::from_be_bytes([raw[17], raw[18]]) as usize;
    if TELEMETRY_HEADER_SIZE + length > raw.len() {
        return Err(LinkError::MalformedPacket("declared length overruns packet"));
    }

    let mut iv = [0u8; NONCE_SIZE];
    iv.copy_from_slice(&raw[5..17]);

    let mut plaintext = raw[TELEMETRY_HEADER_SIZE..TELEMETRY_HEADER_SIZE + length].to_vec();
    apply_link_cipher(key, &iv, sequence, &mut plaintext);

    let text = String::from_utf8(plaintext)
        .map_err(|_| LinkError::MalformedPacket("payload is not valid UTF-8"))?;

    Ok(DecryptedPayload { text, sequence })
}

/// Encrypt a payload into a telemetry packet with a fresh random IV.
/// Inverse of [`decode_packet`]; the sender side of the wire contract.
pub fn encode_packet(key: &[u8; KEY_SIZE], sequence: u32, payload: &[u8]) -> Vec<u8> {
    encode_packet_with_iv(key, sequence, &random_nonce(), payload)
}

pub fn encode_packet_with_iv(
    key: &[u8; KEY_SIZE],
    sequence: u32,
    iv: &[u8; NONCE_SIZE],
    payload: &[u8],
) -> Vec<u8> {
    let mut ciphertext = payload.to_vec();
    apply_link_cipher(key, iv, sequence, &mut ciphertext);

    let mut packet = Vec::with_capacity(TELEMETRY_HEADER_SIZE + ciphertext.len());
    packet.push(PROTOCOL_VERSION);
    packet.extend_from_slice(&sequence.to_be_bytes());
    packet.extend_from_slice(iv);
    packet.extend_from_slice(&(ciphertext.len() as u16).to_be_bytes());
    packet.extend_from_slice(&ciphertext);
    packet
}
