use std::error::Error;
use std::time::Duration;

use log::{info, warn};
use rand::Rng;
use tokio::time::MissedTickBehavior;

use crate::cloud::CloudClient;
use crate::poller::CommandPoller;
use crate::radio::{CommandLink, RadioLink, TcpRadio};
use crate::KEY_SIZE;

/// Run the command issuer node: poll the cloud desired-state document at a
/// fixed interval and drive the fail-safe state machine.
///
/// One tick performs at most one blocking HTTP GET (bounded by the poll
/// timeout) and up to two radio transmits. The loop never exits on a poll
/// error; the state machine turns those into a latched safety Stop.
pub async fn run(
    radio_addr: &str,
    attrs_url: &str,
    link_key: [u8; KEY_SIZE],
    poll_interval_ms: u64,
) -> Result<(), Box<dyn Error>> {
    let mut radio = TcpRadio::connect(radio_addr).await?;
    send_spectrum_burst(&mut radio).await;

    let mut link = CommandLink::new(link_key, radio);
    let mut poller = CommandPoller::new();
    // Seed the receiver with the default speed pair before the first poll.
    poller.send_initial_speeds(&mut link).await;

    let cloud = CloudClient::new(attrs_url)?;
    println!("Command issuer ready | polling {} every {} ms", attrs_url, poll_interval_ms);

    let mut interval = tokio::time::interval(Duration::from_millis(poll_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let outcome = cloud.fetch_desired_state().await;
        poller.tick(outcome, &mut link).await;
    }
}

/// Transmit a burst of random bytes so a spectrum analyzer can verify the
/// radio path before any real command goes out.
async fn send_spectrum_burst<R: RadioLink>(radio: &mut R) {
    const BURST_SIZE: usize = 192;
    let mut payload = [0u8; BURST_SIZE];
    rand::rng().fill(&mut payload[..]);

    info!("Sending spectrum test burst ({} bytes)", BURST_SIZE);
    if let Err(e) = radio.transmit(&payload).await {
        warn!("Spectrum test burst failed: {}", e);
    }
}
