//! Load publisher binary.
//!
//! Usage: `tannoy-publisher <topic> <primary-host:port> <backup-host:port>`
//!
//! Publishes sequence-number payloads at 10 Hz through the failover state
//! machine.

use std::time::Duration;
use tannoy_publisher::{Delivery, FailoverPublisher, PublisherConfig};
use tokio::time::interval;
use tracing::{info, warn};

/// 10 Hz publish cadence.
const PUBLISH_INTERVAL: Duration = Duration::from_millis(100);

fn usage() -> ! {
    eprintln!("usage: tannoy-publisher <topic> <primary-host:port> <backup-host:port>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> tannoy_core::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let mut args = std::env::args().skip(1);
    let (Some(topic), Some(primary_addr), Some(backup_addr)) =
        (args.next(), args.next(), args.next())
    else {
        usage()
    };

    let config = PublisherConfig::new(primary_addr, backup_addr);
    let mut publisher = FailoverPublisher::new(config)?;
    info!(topic, "publishing at 10 Hz");

    let mut ticker = interval(PUBLISH_INTERVAL);
    let mut seq: u64 = 1;
    loop {
        ticker.tick().await;
        match publisher.publish(&topic, &seq.to_string()).await? {
            Delivery::Acknowledged => info!(seq, "published and acknowledged"),
            Delivery::FailedOver => warn!(seq, "primary failed, replayed window to backup"),
            Delivery::SentToBackup => info!(seq, "published to backup"),
        }
        seq += 1;
    }
}
