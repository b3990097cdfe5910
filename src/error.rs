use thiserror::Error;

/// Error taxonomy for the link. Nothing here is fatal to a node: every variant
/// is handled within the tick or packet that produced it and the loop continues.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Header or length violates the wire format. Dropped silently.
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    /// The underlying cipher or AEAD primitive reported failure.
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// Network or radio call failed or timed out. Triggers the fail-safe
    /// Stop transition on the command issuer.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The expected JSON shape was absent. Treated like a transport failure
    /// for fail-safe purposes.
    #[error("unexpected payload shape: {0}")]
    Parse(String),
}
