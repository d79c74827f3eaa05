//! Subscriber binary.
//!
//! Usage: `tannoy-consumer <topic> <primary-host:port> <backup-host:port>`
//!
//! Opens one persistent subscription to each broker and prints every payload
//! received. Duplicates across the two connections are expected after a
//! failover.

use tannoy_consumer::Subscription;
use tracing::{info, warn};

fn usage() -> ! {
    eprintln!("usage: tannoy-consumer <topic> <primary-host:port> <backup-host:port>");
    std::process::exit(2);
}

/// Subscribe to one broker and print payloads until the connection closes.
async fn consume(broker: &'static str, addr: String, topic: String) {
    let mut subscription = match Subscription::connect(&addr, &topic).await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(broker, %addr, error = %e, "subscribe failed");
            return;
        },
    };
    info!(broker, %addr, topic, "subscribed");

    loop {
        match subscription.next_payload().await {
            Ok(Some(payload)) => println!("{payload}"),
            Ok(None) => {
                warn!(broker, %addr, "connection closed");
                return;
            },
            Err(e) => {
                warn!(broker, %addr, error = %e, "read failed");
                return;
            },
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let mut args = std::env::args().skip(1);
    let (Some(topic), Some(primary_addr), Some(backup_addr)) =
        (args.next(), args.next(), args.next())
    else {
        usage()
    };

    let primary = tokio::spawn(consume("primary", primary_addr, topic.clone()));
    let backup = tokio::spawn(consume("backup", backup_addr, topic));

    let _ = tokio::join!(primary, backup);
}
