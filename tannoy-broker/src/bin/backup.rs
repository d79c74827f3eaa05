//! Backup broker binary.
//!
//! Usage: `tannoy-backup <port> <primary-host:port>`
//!
//! Buffers replicated publishes from the primary and probes it once per
//! second; the first failed probe triggers a one-shot takeover drain.

use tannoy_broker::{Broker, BrokerConfig};
use tracing::info;

fn usage() -> ! {
    eprintln!("usage: tannoy-backup <port> <primary-host:port>");
    std::process::exit(2);
}

fn parse_args() -> BrokerConfig {
    let mut args = std::env::args().skip(1);
    let (Some(port), Some(primary_addr)) = (args.next(), args.next()) else { usage() };
    let Ok(port) = port.parse::<u16>() else { usage() };

    BrokerConfig::backup(format!("0.0.0.0:{port}"), primary_addr)
}

#[tokio::main]
async fn main() -> tannoy_core::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let config = parse_args();
    let handle = Broker::new(config)?.start().await?;
    info!(addr = %handle.local_addr(), "backup broker ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.shutdown();
    Ok(())
}
