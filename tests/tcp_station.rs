//! Station and driver against a scripted TCP serial port server

use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wxt5x0_core::config::{DriverConfig, Protocol, SensorMap};
use wxt5x0_core::core::driver::{Driver, DriverError, PollSettings};
use wxt5x0_core::core::protocol::{parse, Station};
use wxt5x0_core::core::transport::{TcpConfig, TcpTransport, TransportTrait};

const COMPOSITE: &[u8] =
    b"0R0,Dn=236D,Dm=283D,Dx=031D,Sn=0.0M,Sm=1.0M,Sx=2.2M,Ta=23.0C,Ua=30.0P,Pa=1022.0H,Rc=10.00M\r\n";

/// Accepts one client and answers each expected request in order
async fn serve(script: Vec<(&'static [u8], &'static [u8])>) -> (u16, JoinHandle<Result<(), String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| format!("accept failed: {}", e))?;

        for (request, response) in script {
            let mut buf = vec![0u8; request.len()];
            stream
                .read_exact(&mut buf)
                .await
                .map_err(|e| format!("read failed: {}", e))?;
            if buf != request {
                return Err(format!(
                    "expected {:?}, got {:?}",
                    String::from_utf8_lossy(request),
                    String::from_utf8_lossy(&buf)
                ));
            }
            stream
                .write_all(response)
                .await
                .map_err(|e| format!("write failed: {}", e))?;
        }
        Ok(())
    });

    (port, handle)
}

fn tcp_station(port: u16, address: u32) -> Station {
    let transport = TcpTransport::new(TcpConfig::new("127.0.0.1", port).timeout(1));
    Station::new(Box::new(transport), address)
}

fn settings() -> PollSettings {
    PollSettings {
        poll_interval: Duration::ZERO,
        max_tries: 2,
        retry_wait: Duration::ZERO,
        sensor_map: SensorMap::default(),
    }
}

#[tokio::test]
async fn test_composite_over_tcp_parses_like_direct_bytes() {
    let (port, server) = serve(vec![(b"0R0\r\n", COMPOSITE)]).await;

    let mut station = tcp_station(port, 0);
    station.open().await.unwrap();
    let raw = station.get_composite().await.unwrap();
    station.close().await.unwrap();

    assert_eq!(&raw[..], COMPOSITE);
    assert_eq!(parse(&raw), parse(COMPOSITE));
    assert_eq!(parse(&raw).get("temperature"), Some(&Some(23.0)));
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_addressed_commands_over_tcp() {
    let (port, server) = serve(vec![
        (b"?\r\n", b"3\r\n"),
        (b"3XZRU\r\n", b""),
        (b"3A4\r\n", b""),
        (b"4R2\r\n", b"4R2,Ta=21.5C,Ua=40.0P,Pa=1001.2H\r\n"),
    ])
    .await;

    let mut station = tcp_station(port, 3);
    station.open().await.unwrap();

    let reply = station.get_address().await.unwrap();
    assert_eq!(&reply[..], b"3\r\n");
    station.precip_counter_reset().await.unwrap();
    station.set_address(4).await.unwrap();
    assert_eq!(station.address(), 4);

    let pth = parse(&station.get_pth().await.unwrap());
    assert_eq!(pth.get("humidity"), Some(&Some(40.0)));
    assert_eq!(pth.get("pressure"), Some(&Some(1001.2)));

    station.close().await.unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_driver_packets_over_tcp() {
    let (port, server) = serve(vec![
        (b"0R0\r\n", COMPOSITE),
        (b"0R0\r\n", b"0R0,Ta=23.5C,Rc=10.50M\r\n"),
    ])
    .await;

    let mut driver = Driver::open(tcp_station(port, 0), "WXT520", settings())
        .await
        .unwrap();

    let packets: Vec<_> = driver.packets().take(2).collect().await;
    driver.close().await.unwrap();

    let first = packets[0].as_ref().unwrap();
    assert_eq!(first.value("outTemp"), Some(23.0));
    assert_eq!(first.value("windDir"), Some(283.0));
    assert_eq!(first.value("rain_total"), Some(10.0));
    assert!(first.contains("rain"));
    assert_eq!(first.value("rain"), None);

    let second = packets[1].as_ref().unwrap();
    assert_eq!(second.value("outTemp"), Some(23.5));
    let rain = second.value("rain").unwrap();
    assert!((rain - 0.5).abs() < 1e-9);

    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connect_from_config() {
    let (port, server) = serve(vec![(b"2R0\r\n", b"2R0,Ta=-4.0C\r\n")]).await;

    let config = DriverConfig {
        protocol: Protocol::Tcp,
        tcp_host: "127.0.0.1".to_string(),
        tcp_port: port,
        address: 2,
        timeout_secs: 1,
        poll_interval: 0,
        ..DriverConfig::default()
    };

    let mut driver = Driver::connect(&config).await.unwrap();
    let packet = driver.next_packet().await.unwrap().unwrap();
    driver.close().await.unwrap();

    assert_eq!(packet.value("outTemp"), Some(-4.0));
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_silent_station_yields_empty_line() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let mut station = tcp_station(port, 0);
    station.open().await.unwrap();
    let raw = station.get_composite().await.unwrap();
    station.close().await.unwrap();

    assert!(raw.is_empty());
    assert!(parse(&raw).is_empty());
    server.abort();
}

#[tokio::test]
async fn test_refused_connection_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut transport = TcpTransport::new(TcpConfig::new("127.0.0.1", port).timeout(1));
    assert!(transport.open().await.is_err());
    assert!(!transport.is_open());

    let result = Driver::open(tcp_station(port, 0), "WXT520", settings()).await;
    assert!(matches!(result, Err(DriverError::Connection(_))));
}
