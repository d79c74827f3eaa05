//! Primary broker binary.
//!
//! Usage: `tannoy-primary <port> [backup-host:port]`
//!
//! With a backup address the broker replicates every accepted publish before
//! acknowledging it; without one it runs standalone.

use tannoy_broker::{Broker, BrokerConfig};
use tracing::info;

fn usage() -> ! {
    eprintln!("usage: tannoy-primary <port> [backup-host:port]");
    std::process::exit(2);
}

fn parse_args() -> BrokerConfig {
    let mut args = std::env::args().skip(1);
    let Some(port) = args.next() else { usage() };
    let Ok(port) = port.parse::<u16>() else { usage() };
    let backup_addr = args.next();

    BrokerConfig::primary(format!("0.0.0.0:{port}"), backup_addr)
}

#[tokio::main]
async fn main() -> tannoy_core::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let config = parse_args();
    match &config.role {
        tannoy_broker::RoleConfig::Primary { backup_addr: Some(addr) } => {
            info!(backup = %addr, "starting primary broker");
        },
        _ => info!("starting standalone primary broker"),
    }

    let handle = Broker::new(config)?.start().await?;
    info!(addr = %handle.local_addr(), "primary broker ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.shutdown();
    Ok(())
}
