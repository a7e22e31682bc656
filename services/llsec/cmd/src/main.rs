//! llsec node binary.
//!
//! Loads the node's security configuration and runs a loopback self-test:
//! a payload is secured by this node, handed to a peer provisioned with the
//! same keys and policy, and checked after unsecuring.

use anyhow::{bail, Context};
use clap::Parser;
use llsec_security::{SecureFramer, SecurityContext};
use llsec_wire::{CompactFramer, FrameAttributes, FrameDescriptor, LinkAddr};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;

use config::NodeConfig;
use logging::LlsecLogFormatter;

/// IEEE 802.15.4 link-layer security node
#[derive(Parser, Debug)]
#[command(name = "llsec-node", version, about = "Link-layer security loopback node")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Payload to send through the loopback
    #[arg(long, default_value = "PING")]
    payload: String,

    /// Link address of the loopback peer
    #[arg(long, default_value = "0012.4b00.0000.0002")]
    peer: LinkAddr,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("llsec_node={}", args.log_level).parse()?)
        .add_directive(format!("llsec_security={}", args.log_level).parse()?)
        .add_directive(format!("llsec_wire={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .event_format(LlsecLogFormatter::new("llsec"))
        .init();

    info!("Starting llsec node v{}", env!("CARGO_PKG_VERSION"));

    let node_config = NodeConfig::load_from_file(&args.config)?;
    if node_config.node_addr == args.peer {
        bail!("peer address {} is this node's own address", args.peer);
    }

    let local = Arc::new(
        node_config
            .build_context()
            .context("invalid llsec configuration")?,
    );
    let peer = Arc::new(
        node_config
            .build_context_for(args.peer)
            .context("invalid llsec configuration")?,
    );

    match loopback(local, peer, args.payload.as_bytes()) {
        Ok(received) => {
            component_info!(
                "selftest",
                "Loopback succeeded: {:?}",
                String::from_utf8_lossy(&received)
            );
            Ok(())
        }
        Err(e) => {
            component_error!("selftest", "Loopback failed: {:#}", e);
            Err(e)
        }
    }
}

/// Secure `payload` at `local`, unsecure it at `peer` and return what the
/// peer received
fn loopback(
    local: Arc<SecurityContext>,
    peer: Arc<SecurityContext>,
    payload: &[u8],
) -> anyhow::Result<Vec<u8>> {
    let mut sender = SecureFramer::new(local, CompactFramer::new());
    let mut receiver = SecureFramer::new(Arc::clone(&peer), CompactFramer::new());

    let mut frame = FrameDescriptor::outbound(payload, FrameAttributes::default())?;
    sender.prepare_outbound(&mut frame);
    frame.attrs_mut().receiver = peer.local_addr();
    frame.attrs_mut().seqno = 1;

    let max_payload = sender.max_payload(&frame);
    if payload.len() > max_payload {
        bail!("payload of {} bytes exceeds {} bytes", payload.len(), max_payload);
    }

    let hdr_len = sender
        .create_secure_frame(&mut frame)
        .context("failed to secure frame")?;
    let wire = frame.into_bytes();
    component_debug!(
        "selftest",
        "Sent {} bytes (header {}): {}",
        wire.len(),
        hdr_len,
        hex::encode(&wire)
    );

    let mut received = FrameDescriptor::inbound(&wire)?;
    receiver
        .parse_secure_frame(&mut received)
        .context("peer rejected frame")?;

    if received.payload() != payload {
        component_warn!("selftest", "Peer received {} bytes that differ from the payload", received.data_len());
        bail!("payload mismatch after loopback");
    }
    Ok(received.payload().to_vec())
}
