//! Radio transceiver interface.
//!
//! The core treats the radio as an opaque byte transport and never touches
//! modulation parameters. `TcpRadio` talks to a transceiver bridge over TCP:
//! transmitted frames are sent as a big-endian u32 length prefix plus payload;
//! received frames arrive as length (u32), RSSI in dBm (i32), SNR in dB (f32),
//! then the payload, all big-endian.

use std::future::Future;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::control::{Command, FrameEncoder};
use crate::error::LinkError;
use crate::poller::CommandSink;
use crate::KEY_SIZE;

/// Largest frame the bridge is allowed to hand us. Anything bigger is a
/// corrupt length prefix, not a real radio packet.
const MAX_BRIDGE_FRAME: usize = 1024;

/// Raw bytes received from the radio, with per-packet signal metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPacket {
    pub data: Vec<u8>,
    pub rssi_dbm: i32,
    pub snr_db: f32,
}

/// Opaque byte transport to the transceiver.
pub trait RadioLink {
    fn transmit(&mut self, frame: &[u8]) -> impl Future<Output = Result<(), LinkError>>;
    fn receive(&mut self) -> impl Future<Output = Result<Option<ReceivedPacket>, LinkError>>;
}

/// Transceiver bridge connection over TCP.
pub struct TcpRadio {
    stream: TcpStream,
}

impl TcpRadio {
    pub async fn connect(addr: &str) -> Result<Self, LinkError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| LinkError::Transport(format!("radio bridge connect to {}: {}", addr, e)))?;
        debug!("Connected to radio bridge at {}", addr);
        Ok(TcpRadio { stream })
    }
}

impl RadioLink for TcpRadio {
    async fn transmit(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.stream
            .write_u32(frame.len() as u32)
            .await
            .map_err(|e| LinkError::Transport(format!("radio write length: {}", e)))?;
        self.stream
            .write_all(frame)
            .await
            .map_err(|e| LinkError::Transport(format!("radio write frame: {}", e)))?;
        // Flush so the bridge keys the transmitter immediately.
        self.stream
            .flush()
            .await
            .map_err(|e| LinkError::Transport(format!("radio flush: {}", e)))?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<ReceivedPacket>, LinkError> {
        let length = match self.stream.read_u32().await {
            Ok(n) => n as usize,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(LinkError::Transport(format!("radio read length: {}", e))),
        };
        if length > MAX_BRIDGE_FRAME {
            return Err(LinkError::Transport(format!("bridge frame of {} bytes rejected", length)));
        }

        let rssi_dbm = self
            .stream
            .read_i32()
            .await
            .map_err(|e| LinkError::Transport(format!("radio read rssi: {}", e)))?;
        let snr_db = self
            .stream
            .read_f32()
            .await
            .map_err(|e| LinkError::Transport(format!("radio read snr: {}", e)))?;

        let mut data = vec![0u8; length];
        self.stream
            .read_exact(&mut data)
            .await
            .map_err(|e| LinkError::Transport(format!("radio read frame: {}", e)))?;

        Ok(Some(ReceivedPacket { data, rssi_dbm, snr_db }))
    }
}

/// A `FrameEncoder` wired to a radio: the production `CommandSink`.
///
/// The sequence counter advances inside the encoder on every attempt, so a
/// frame rejected by the radio still consumes its sequence number.
pub struct CommandLink<R: RadioLink> {
    encoder: FrameEncoder,
    radio: R,
}

impl<R: RadioLink> CommandLink<R> {
    pub fn new(key: [u8; KEY_SIZE], radio: R) -> Self {
        CommandLink { encoder: FrameEncoder::new(key), radio }
    }
}

impl<R: RadioLink> CommandSink for CommandLink<R> {
    async fn send_command(
        &mut self,
        command: Command,
        left_speed: u8,
        right_speed: u8,
    ) -> Result<(), LinkError> {
        let frame = self.encoder.next_frame(command, left_speed, right_speed);
        self.radio.transmit(&frame).await?;
        debug!("TX -> cmd={:?} left={} right={}", command, left_speed, right_speed);
        Ok(())
    }
}

/// Space-separated uppercase hex, for per-packet field diagnostics.
pub fn hex_dump(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

/// Printable ASCII with '.' for everything else.
pub fn ascii_dump(data: &[u8]) -> String {
    data.iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}
