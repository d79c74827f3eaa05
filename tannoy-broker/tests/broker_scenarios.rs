//! End-to-end broker scenarios over real sockets.

use std::net::SocketAddr;
use std::time::Duration;
use tannoy_broker::{Broker, BrokerConfig, BrokerHandle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Generous settle time for a frame to pass through the dispatcher.
const SETTLE: Duration = Duration::from_millis(300);

async fn start_primary(backup_addr: Option<String>) -> BrokerHandle {
    Broker::new(BrokerConfig::primary("127.0.0.1:0", backup_addr))
        .unwrap()
        .start()
        .await
        .unwrap()
}

async fn start_backup(primary_addr: String) -> BrokerHandle {
    Broker::new(BrokerConfig::backup("127.0.0.1:0", primary_addr))
        .unwrap()
        .start()
        .await
        .unwrap()
}

async fn connect_subscriber(addr: SocketAddr, topic: &str) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(format!("SUBSCRIBE|{topic}\n").as_bytes()).await.unwrap();
    BufReader::new(stream)
}

/// Read one line, panicking on timeout; `None` means the peer closed.
async fn read_line_within(
    reader: &mut BufReader<TcpStream>,
    deadline: Duration,
) -> Option<String> {
    let mut line = String::new();
    match timeout(deadline, reader.read_line(&mut line)).await {
        Ok(Ok(0)) => None,
        Ok(Ok(_)) => Some(line),
        Ok(Err(e)) => panic!("read failed: {e}"),
        Err(_) => panic!("timed out waiting for a line"),
    }
}

/// Expect no line (and no EOF-triggering close) for the whole window.
async fn assert_silent(reader: &mut BufReader<TcpStream>, window: Duration) {
    let mut line = String::new();
    match timeout(window, reader.read_line(&mut line)).await {
        Err(_) => {},
        Ok(Ok(0)) => panic!("connection closed unexpectedly"),
        Ok(Ok(_)) => panic!("unexpected line: {line:?}"),
        Ok(Err(e)) => panic!("read failed: {e}"),
    }
}

/// Scripted primary that answers every probe with `PONG`.
fn spawn_pong_server(listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                if reader.read_line(&mut line).await.is_ok() {
                    let _ = reader.get_mut().write_all(b"PONG\n").await;
                }
            });
        }
    })
}

#[tokio::test]
async fn single_broker_fan_out() {
    let primary = start_primary(None).await;
    let addr = primary.local_addr();

    let mut subscriber = connect_subscriber(addr, "weather").await;
    sleep(SETTLE).await;

    let mut publisher = BufReader::new(TcpStream::connect(addr).await.unwrap());
    publisher.get_mut().write_all(b"PUBLISH|weather|sunny\n").await.unwrap();

    // Standalone primary still acknowledges.
    assert_eq!(read_line_within(&mut publisher, Duration::from_secs(1)).await.unwrap(), "ACK\n");

    // Payload arrives after the simulated compute window.
    assert_eq!(read_line_within(&mut subscriber, Duration::from_secs(2)).await.unwrap(), "sunny\n");

    // The broker closes the publisher connection after fan-out.
    assert_eq!(read_line_within(&mut publisher, Duration::from_secs(2)).await, None);

    primary.shutdown();
}

#[tokio::test]
async fn probe_is_answered_with_pong() {
    let primary = start_primary(None).await;

    let mut probe = BufReader::new(TcpStream::connect(primary.local_addr()).await.unwrap());
    probe.get_mut().write_all(b"PING||\n").await.unwrap();
    assert_eq!(read_line_within(&mut probe, Duration::from_secs(1)).await.unwrap(), "PONG\n");

    primary.shutdown();
}

#[tokio::test]
async fn repeat_subscribe_delivers_twice() {
    let primary = start_primary(None).await;
    let addr = primary.local_addr();

    let mut subscriber = TcpStream::connect(addr).await.unwrap();
    subscriber.write_all(b"SUBSCRIBE|t\nSUBSCRIBE|t\n").await.unwrap();
    let mut subscriber = BufReader::new(subscriber);
    sleep(SETTLE).await;

    let mut publisher = TcpStream::connect(addr).await.unwrap();
    publisher.write_all(b"PUBLISH|t|y\n").await.unwrap();

    assert_eq!(read_line_within(&mut subscriber, Duration::from_secs(2)).await.unwrap(), "y\n");
    assert_eq!(read_line_within(&mut subscriber, Duration::from_secs(2)).await.unwrap(), "y\n");

    primary.shutdown();
}

#[tokio::test]
async fn malformed_input_closes_only_that_connection() {
    let primary = start_primary(None).await;
    let addr = primary.local_addr();

    let mut subscriber = connect_subscriber(addr, "t").await;
    sleep(SETTLE).await;

    // The offending connection is closed...
    let mut offender = BufReader::new(TcpStream::connect(addr).await.unwrap());
    offender.get_mut().write_all(b"HELLO\n").await.unwrap();
    assert_eq!(read_line_within(&mut offender, Duration::from_secs(2)).await, None);

    // ...and the rest of the broker state is untouched.
    let mut publisher = TcpStream::connect(addr).await.unwrap();
    publisher.write_all(b"PUBLISH|t|still-works\n").await.unwrap();
    assert_eq!(
        read_line_within(&mut subscriber, Duration::from_secs(2)).await.unwrap(),
        "still-works\n"
    );

    primary.shutdown();
}

#[tokio::test]
async fn primary_replicates_before_ack_and_clears_after_fan_out() {
    // Scripted backup so the replication stream can be observed verbatim.
    let backup_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backup_addr = backup_listener.local_addr().unwrap();

    let primary = start_primary(Some(backup_addr.to_string())).await;
    let addr = primary.local_addr();

    let (link, _) = timeout(Duration::from_secs(2), backup_listener.accept())
        .await
        .expect("primary never dialed the backup")
        .unwrap();
    let mut link = BufReader::new(link);

    let mut subscriber = connect_subscriber(addr, "t").await;
    sleep(SETTLE).await;

    let mut publisher = BufReader::new(TcpStream::connect(addr).await.unwrap());
    publisher.get_mut().write_all(b"PUBLISH|t|x\n").await.unwrap();

    // Replication frames arrive in causal order.
    let mut line = String::new();
    timeout(Duration::from_secs(1), link.read_line(&mut line)).await.unwrap().unwrap();
    assert_eq!(line, "REPLICATE|t|x\n");

    // The acknowledgement follows the replicate handoff.
    assert_eq!(read_line_within(&mut publisher, Duration::from_secs(1)).await.unwrap(), "ACK\n");

    assert_eq!(read_line_within(&mut subscriber, Duration::from_secs(2)).await.unwrap(), "x\n");

    line.clear();
    timeout(Duration::from_secs(1), link.read_line(&mut line)).await.unwrap().unwrap();
    assert_eq!(line, "CLEAR|t|x\n");

    primary.shutdown();
}

#[tokio::test]
async fn backup_drops_live_publishes_while_primary_alive() {
    let primary_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let primary_addr = primary_listener.local_addr().unwrap();
    let pong_server = spawn_pong_server(primary_listener);

    let backup = start_backup(primary_addr.to_string()).await;
    let addr = backup.local_addr();

    let mut subscriber = connect_subscriber(addr, "t").await;
    sleep(SETTLE).await;

    let mut publisher = BufReader::new(TcpStream::connect(addr).await.unwrap());
    publisher.get_mut().write_all(b"PUBLISH|t|dropped\n").await.unwrap();

    // The publisher is disconnected without an acknowledgement...
    assert_eq!(read_line_within(&mut publisher, Duration::from_secs(2)).await, None);
    // ...and nothing reaches the subscriber.
    assert_silent(&mut subscriber, Duration::from_millis(500)).await;

    backup.shutdown();
    pong_server.abort();
}

#[tokio::test]
async fn takeover_drains_replica_buffer_to_subscribers() {
    let primary_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let primary_addr = primary_listener.local_addr().unwrap();
    let pong_server = spawn_pong_server(primary_listener);

    let backup = start_backup(primary_addr.to_string()).await;
    let addr = backup.local_addr();

    let mut subscriber = connect_subscriber(addr, "t").await;

    // Simulate the primary's replication stream: one accepted publish whose
    // CLEAR never arrives.
    let mut link = TcpStream::connect(addr).await.unwrap();
    link.write_all(b"REPLICATE|t|42\n").await.unwrap();
    sleep(SETTLE).await;

    // Kill the scripted primary; the next probe fails and takeover fires.
    pong_server.abort();

    assert_eq!(read_line_within(&mut subscriber, Duration::from_secs(6)).await.unwrap(), "42\n");

    backup.shutdown();
}

#[tokio::test]
async fn cleared_entries_are_not_drained_at_takeover() {
    let primary_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let primary_addr = primary_listener.local_addr().unwrap();
    let pong_server = spawn_pong_server(primary_listener);

    let backup = start_backup(primary_addr.to_string()).await;
    let addr = backup.local_addr();

    let mut subscriber = connect_subscriber(addr, "t").await;

    let mut link = TcpStream::connect(addr).await.unwrap();
    link.write_all(b"REPLICATE|t|done\nCLEAR|t|done\nREPLICATE|t|pending\n")
        .await
        .unwrap();
    sleep(SETTLE).await;

    pong_server.abort();

    // Only the uncleared entry is delivered.
    assert_eq!(
        read_line_within(&mut subscriber, Duration::from_secs(6)).await.unwrap(),
        "pending\n"
    );
    assert_silent(&mut subscriber, Duration::from_millis(500)).await;

    backup.shutdown();
}
