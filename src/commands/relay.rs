use std::error::Error;

use log::{debug, info, warn};

use crate::cloud::CloudClient;
use crate::cryptography::RelayEncryptor;
use crate::radio::{ascii_dump, hex_dump, RadioLink, TcpRadio};
use crate::telemetry::decode_packet;
use crate::KEY_SIZE;

/// Run the telemetry relay node: radio receive → decrypt → re-encrypt for the
/// cloud agent → HTTP POST.
///
/// Every failure is local to the packet that produced it: malformed packets
/// are dropped, crypto and upload failures are logged, and the loop moves on.
/// There is no actuator on this node, so nothing here is safety-critical.
pub async fn run(
    radio_addr: &str,
    ingest_url: &str,
    token: &str,
    link_key: [u8; KEY_SIZE],
) -> Result<(), Box<dyn Error>> {
    let mut radio = TcpRadio::connect(radio_addr).await?;
    let encryptor = RelayEncryptor::new(token);
    let cloud = CloudClient::new(ingest_url)?;

    println!("Telemetry relay ready | radio bridge {} -> {}", radio_addr, ingest_url);

    loop {
        let packet = match radio.receive().await {
            Ok(Some(packet)) => packet,
            Ok(None) => return Err("radio bridge closed the connection".into()),
            Err(e) => return Err(format!("radio bridge failed: {}", e).into()),
        };

        info!(
            "Radio packet | len={} RSSI={} dBm SNR={:.1} dB",
            packet.data.len(),
            packet.rssi_dbm,
            packet.snr_db
        );
        debug!("HEX:   {}", hex_dump(&packet.data));
        debug!("ASCII: {}", ascii_dump(&packet.data));

        let payload = match decode_packet(&link_key, &packet.data) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Dropping packet: {}", e);
                continue;
            }
        };
        info!(
            "DEC | seq={} json_len={} -> {}",
            payload.sequence,
            payload.text.len(),
            payload.text
        );

        let envelope = match encryptor.encrypt(payload.text.as_bytes()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Agent encryption failed: {}", e);
                continue;
            }
        };

        if let Err(e) = cloud.post_envelope(&envelope).await {
            warn!("Upload skipped: {}", e);
        }
    }
}
