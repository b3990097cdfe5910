//! Control frame codec for the command leg.
//!
//! Frames are constant-size on the air so the radio needs no length field:
//! a 12-byte random IV followed by the 4-byte AES-256-CTR ciphertext of
//! `[command, left_speed, right_speed, sequence]`. Both ends of the link must
//! agree on this layout bit-for-bit.

use crate::cryptography::{apply_link_cipher, random_nonce};
use crate::error::LinkError;
use crate::{CONTROL_FRAME_SIZE, KEY_SIZE, NONCE_SIZE};

/// Motion commands understood by the drive firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stop,
    Forward,
    Backward,
    Left,
    Right,
    SetSpeed,
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Command::Stop => 0,
            Command::Forward => 1,
            Command::Backward => 2,
            Command::Left => 3,
            Command::Right => 4,
            Command::SetSpeed => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Command> {
        match code {
            0 => Some(Command::Stop),
            1 => Some(Command::Forward),
            2 => Some(Command::Backward),
            3 => Some(Command::Left),
            4 => Some(Command::Right),
            5 => Some(Command::SetSpeed),
            _ => None,
        }
    }

    /// Map a desired-state label to a command. Matching is case-insensitive
    /// via prior normalization; anything unrecognized is a Stop.
    pub fn from_state_label(label: &str) -> Command {
        match label {
            "forward" => Command::Forward,
            "backward" => Command::Backward,
            "left" => Command::Left,
            "right" => Command::Right,
            "speed" => Command::SetSpeed,
            _ => Command::Stop,
        }
    }
}

/// One motion command as laid out in frame plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    pub command: Command,
    pub left_speed: u8,
    pub right_speed: u8,
    pub sequence: u8,
}

/// Builds encrypted control frames with a strictly advancing 8-bit sequence.
///
/// The sequence increments once per built frame regardless of content or of
/// whether the radio later accepts it: retries must never reuse a sequence
/// number, or the receiver cannot tell a retry from a replay.
pub struct FrameEncoder {
    key: [u8; KEY_SIZE],
    sequence: u8,
}

impl FrameEncoder {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        FrameEncoder { key, sequence: 0 }
    }

    /// Assemble and encrypt the next frame. Output size is fixed; the frame
    /// is never produced unencrypted.
    pub fn next_frame(&mut self, command: Command, left_speed: u8, right_speed: u8) -> [u8; CONTROL_FRAME_SIZE] {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        // The fresh random IV alone guarantees keystream uniqueness here, so
        // the counter starts at zero (the sequence travels inside the body).
        let iv = random_nonce();
        let mut body = [command.code(), left_speed, right_speed, sequence];
        apply_link_cipher(&self.key, &iv, 0, &mut body);

        let mut frame = [0u8; CONTROL_FRAME_SIZE];
        frame[..NONCE_SIZE].copy_from_slice(&iv);
        frame[NONCE_SIZE..].copy_from_slice(&body);
        frame
    }
}

/// Decrypt a received control frame. This is the receiver firmware's half of
/// the contract; kept here so tests exercise both directions.
pub fn decode_frame(key: &[u8; KEY_SIZE], frame: &[u8]) -> Result<ControlFrame, LinkError> {
    if frame.len() != CONTROL_FRAME_SIZE {
        return Err(LinkError::MalformedPacket("control frame has wrong size"));
    }

    let mut iv = [0u8; NONCE_SIZE];
    iv.copy_from_slice(&frame[..NONCE_SIZE]);
    let mut body = [0u8; 4];
    body.copy_from_slice(&frame[NONCE_SIZE..]);
    apply_link_cipher(key, &iv, 0, &mut body);

    let command =
        Command::from_code(body[0]).ok_or(LinkError::MalformedPacket("unknown command code"))?;
    Ok(ControlFrame {
        command,
        left_speed: body[1],
        right_speed: body[2],
        sequence: body[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LINK_KEY;

    #[test]
    fn test_frame_is_fixed_size() {
        let mut encoder = FrameEncoder::new(LINK_KEY);
        let short = encoder.next_frame(Command::Stop, 0, 0);
        let long = encoder.next_frame(Command::SetSpeed, 255, 255);
        assert_eq!(short.len(), CONTROL_FRAME_SIZE);
        assert_eq!(long.len(), CONTROL_FRAME_SIZE);
    }

    #[test]
    fn test_roundtrip() {
        let mut encoder = FrameEncoder::new(LINK_KEY);
        let frame = encoder.next_frame(Command::Forward, 120, 130);
        let decoded = decode_frame(&LINK_KEY, &frame).expect("decode should succeed");
        assert_eq!(decoded.command, Command::Forward);
        assert_eq!(decoded.left_speed, 120);
        assert_eq!(decoded.right_speed, 130);
        assert_eq!(decoded.sequence, 0);
    }

    #[test]
    fn test_sequence_advances_per_frame() {
        let mut encoder = FrameEncoder::new(LINK_KEY);
        for expected in 0..5u8 {
            let frame = encoder.next_frame(Command::Stop, 10, 10);
            let decoded = decode_frame(&LINK_KEY, &frame).unwrap();
            assert_eq!(decoded.sequence, expected);
        }
    }

    #[test]
    fn test_sequence_wraps_at_256() {
        let mut encoder = FrameEncoder::new(LINK_KEY);
        for _ in 0..=255u16 {
            encoder.next_frame(Command::Stop, 0, 0);
        }
        let frame = encoder.next_frame(Command::Left, 1, 2);
        let decoded = decode_frame(&LINK_KEY, &frame).unwrap();
        assert_eq!(decoded.sequence, 0);
    }

    #[test]
    fn test_identical_commands_differ_on_air() {
        let mut encoder = FrameEncoder::new(LINK_KEY);
        let a = encoder.next_frame(Command::Forward, 10, 10);
        let b = encoder.next_frame(Command::Forward, 10, 10);
        // Fresh IV and advancing sequence: no two frames repeat on the air.
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        assert!(matches!(
            decode_frame(&LINK_KEY, &[0u8; CONTROL_FRAME_SIZE - 1]),
            Err(LinkError::MalformedPacket(_))
        ));
        assert!(matches!(
            decode_frame(&LINK_KEY, &[0u8; CONTROL_FRAME_SIZE + 1]),
            Err(LinkError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_state_label_mapping() {
        assert_eq!(Command::from_state_label("forward"), Command::Forward);
        assert_eq!(Command::from_state_label("backward"), Command::Backward);
        assert_eq!(Command::from_state_label("left"), Command::Left);
        assert_eq!(Command::from_state_label("right"), Command::Right);
        assert_eq!(Command::from_state_label("speed"), Command::SetSpeed);
        assert_eq!(Command::from_state_label("stop"), Command::Stop);
        assert_eq!(Command::from_state_label("sideways"), Command::Stop);
    }

    #[test]
    fn test_command_codes_roundtrip() {
        for cmd in [
            Command::Stop,
            Command::Forward,
            Command::Backward,
            Command::Left,
            Command::Right,
            Command::SetSpeed,
        ] {
            assert_eq!(Command::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(Command::from_code(9), None);
    }
}
