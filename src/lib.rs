pub mod cloud;
pub mod commands;
pub mod control;
pub mod cryptography;
pub mod error;
pub mod payload;
pub mod poller;
pub mod radio;
pub mod telemetry;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Telemetry packet wire format: version(1) + sequence(4, BE) + iv(12) + length(2, BE).
pub const PROTOCOL_VERSION: u8 = 0x01;
pub const TELEMETRY_HEADER_SIZE: usize = 19;

/// Control frames are constant-size on the air: 12-byte IV + 4-byte ciphertext.
pub const CONTROL_FRAME_SIZE: usize = 16;

pub const DEFAULT_SPEED: u8 = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const CLOUD_POLL_TIMEOUT_MS: u64 = 1000;

pub const DEFAULT_INGEST_URL: &str = "http://54.81.22.123:5000/api/ingest";
pub const DEFAULT_ATTRS_URL: &str = "http://54.81.22.123:1026/v2/entities/oruga/attrs";
pub const DEFAULT_RADIO_ADDR: &str = "127.0.0.1:7373";

/// Token passphrase used to derive the cloud relay AES-256 key (must match the agent).
pub const DEFAULT_AGENT_TOKEN: &str = "Benchopo2025";

/// Pre-shared AES-256 key for the radio leg. Must match the peer firmware byte-for-byte.
pub const LINK_KEY: [u8; KEY_SIZE] = [
    0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, 0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d, 0x77, 0x81,
    0x1f, 0x35, 0x2c, 0x07, 0x3b, 0x61, 0x08, 0xd7, 0x2d, 0x98, 0x10, 0xa3, 0x09, 0x14, 0xdf, 0xf4,
];
