//! # Commands Module
//!
//! The two node roles of the bridge, one subcommand each:
//!
//! ## `relay`
//! The telemetry relay node:
//! - Receives encrypted packets from the radio bridge
//! - Logs length, RSSI, SNR and a hex/ASCII dump of every packet
//! - Decrypts the stream-cipher payload, drops malformed packets
//! - Re-encrypts the plaintext for the cloud agent (AES-256-GCM envelope)
//! - POSTs the envelope to the ingest endpoint
//!
//! ## `control`
//! The command issuer node:
//! - Polls the cloud desired-state document at a fixed interval
//! - Runs the fail-safe state machine (Stop on any fault, edge-triggered)
//! - Encrypts motion commands into fixed-size control frames
//! - Transmits them over the radio bridge

pub mod control;
pub mod relay;
