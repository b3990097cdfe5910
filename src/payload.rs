//! JSON payloads exchanged with the cloud backend.
//!
//! Two fixed shapes live here:
//! - `CloudEnvelope`, the encrypted body POSTed to the ingest agent.
//! - the desired-state document fetched by the command issuer, three named
//!   attributes each nesting a typed `value`, parsed defensively: anything
//!   not matching the shape is rejected rather than guessed at.

use serde::{Deserialize, Serialize};

use crate::control::Command;
use crate::error::LinkError;

/// Versioned encrypted envelope sent to the ingest agent. All three payload
/// fields are base64 text; `iv` decodes to 12 bytes and `tag` to 16. An
/// envelope missing any field never leaves this node partially assembled:
/// it is built whole by `RelayEncryptor::encrypt` or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudEnvelope {
    pub v: u8,
    pub iv: String,
    pub tag: String,
    pub ct: String,
}

/// One attribute of the desired-state document: an object carrying a typed
/// `value` (sibling fields such as `type` and `metadata` are ignored).
#[derive(Debug, Deserialize)]
pub struct Attribute<T> {
    pub value: T,
}

/// The desired-state document as stored by the backend. Field names and
/// nesting are fixed by contract.
#[derive(Debug, Deserialize)]
pub struct DesiredState {
    pub estado: Attribute<String>,
    pub left_speed: Attribute<i64>,
    pub right_speed: Attribute<i64>,
}

/// A validated, normalized drive request: label lowercased and mapped to a
/// `Command`, speeds clamped into [0, 255].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveRequest {
    pub command: Command,
    pub left_speed: u8,
    pub right_speed: u8,
}

fn clamp_speed(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Parse and normalize a desired-state body. Missing or ill-typed required
/// fields are a `Parse` error; an unrecognized state label normalizes to Stop.
pub fn parse_desired_state(body: &str) -> Result<DriveRequest, LinkError> {
    let state: DesiredState = serde_json::from_str(body)
        .map_err(|e| LinkError::Parse(format!("desired-state document: {}", e)))?;

    let label = state.estado.value.to_lowercase();
    Ok(DriveRequest {
        command: Command::from_state_label(&label),
        left_speed: clamp_speed(state.left_speed.value),
        right_speed: clamp_speed(state.right_speed.value),
    })
}
