use clap::{Parser, Subcommand};
use std::error::Error;

use orugalink::cryptography::derive_key;
use orugalink::{
    DEFAULT_AGENT_TOKEN, DEFAULT_ATTRS_URL, DEFAULT_INGEST_URL, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RADIO_ADDR, KEY_SIZE, LINK_KEY,
};

#[derive(Parser)]
#[command(name = "orugalink")]
#[command(about = "Secure LoRa-to-cloud bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the telemetry relay node (radio -> cloud ingest)
    Relay {
        /// Address of the radio transceiver bridge
        #[arg(long, default_value = DEFAULT_RADIO_ADDR)]
        radio_addr: String,
        /// Ingest endpoint of the cloud agent
        #[arg(long, default_value = DEFAULT_INGEST_URL)]
        ingest_url: String,
        /// Shared token the relay key is derived from (must match the agent)
        #[arg(long, default_value = DEFAULT_AGENT_TOKEN)]
        token: String,
        /// Derive the radio link key from a passphrase instead of the built-in key
        #[arg(long)]
        link_passphrase: Option<String>,
    },
    /// Run the command issuer node (cloud desired state -> radio)
    Control {
        /// Address of the radio transceiver bridge
        #[arg(long, default_value = DEFAULT_RADIO_ADDR)]
        radio_addr: String,
        /// Desired-state document endpoint
        #[arg(long, default_value = DEFAULT_ATTRS_URL)]
        attrs_url: String,
        /// Cloud poll interval in milliseconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
        poll_interval_ms: u64,
        /// Derive the radio link key from a passphrase instead of the built-in key
        #[arg(long)]
        link_passphrase: Option<String>,
    },
}

fn resolve_link_key(passphrase: Option<&str>) -> [u8; KEY_SIZE] {
    match passphrase {
        Some(passphrase) => derive_key(passphrase),
        None => LINK_KEY,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Configure logging based on verbose flag
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::info!("Verbose logging enabled");
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    match cli.command {
        Commands::Relay { radio_addr, ingest_url, token, link_passphrase } => {
            let link_key = resolve_link_key(link_passphrase.as_deref());
            orugalink::commands::relay::run(&radio_addr, &ingest_url, &token, link_key).await?;
        }
        Commands::Control { radio_addr, attrs_url, poll_interval_ms, link_passphrase } => {
            let link_key = resolve_link_key(link_passphrase.as_deref());
            orugalink::commands::control::run(&radio_addr, &attrs_url, link_key, poll_interval_ms)
                .await?;
        }
    }

    Ok(())
}
