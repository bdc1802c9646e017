//! Tests for the Client API: resolution for requests and failover POST.

use failnet::{Client, NetError, Resolver, ResolverPair, ResolverRole, StaticResolve};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";

fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

fn placeholder_servers() -> Vec<SocketAddr> {
    vec!["192.0.2.53:53".parse().unwrap()]
}

fn table<const N: usize>(entries: [(&str, Vec<IpAddr>); N]) -> StaticResolve {
    StaticResolve::from_iter(entries)
}

fn client_with(main: StaticResolve, fallback: StaticResolve) -> Client {
    Client::builder()
        .resolvers(ResolverPair::new(
            Resolver::from_lookup(placeholder_servers(), main),
            Resolver::from_lookup(placeholder_servers(), fallback),
        ))
        .build()
}

/// Reads one request (head plus Content-Length body). `None` on EOF.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + len {
                return Some(String::from_utf8_lossy(&data).into_owned());
            }
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
}

/// Serves `response` to every request on every connection, recording requests.
async fn spawn_server(bind: &str, response: &'static str) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind(bind).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                while let Some(req) = read_request(&mut socket).await {
                    log.lock().unwrap().push(req);
                    if socket.write_all(response.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    (addr, seen)
}

/// A port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// === Resolution for requests ===

#[tokio::test]
async fn test_main_result_returned_in_order() {
    let client = client_with(
        table([("example.com", vec![ip(1, 1, 1, 1), ip(2, 2, 2, 2)])]),
        table([("example.com", vec![ip(1, 1, 1, 3)])]),
    );

    let addrs = client.lookup_for_request("https://example.com").await.unwrap();
    assert_eq!(addrs, vec![ip(1, 1, 1, 1), ip(2, 2, 2, 2)]);
}

#[tokio::test]
async fn test_empty_main_falls_back() {
    let client = client_with(
        table([("example.com", vec![])]),
        table([("example.com", vec![ip(1, 1, 1, 3), ip(2, 2, 2, 3)])]),
    );

    let addrs = client.lookup_for_request("https://example.com").await.unwrap();
    assert_eq!(addrs, vec![ip(1, 1, 1, 3), ip(2, 2, 2, 3)]);
}

#[tokio::test]
async fn test_unconfigured_main_is_skipped() {
    let client = Client::builder()
        .main_resolver(Resolver::from_lookup(
            Vec::new(),
            table([("example.com", vec![ip(1, 1, 1, 1)])]),
        ))
        .fallback_resolver(Resolver::from_lookup(
            placeholder_servers(),
            table([("example.com", vec![ip(1, 1, 1, 3)])]),
        ))
        .build();

    let addrs = client.lookup_for_request("example.com").await.unwrap();
    assert_eq!(addrs, vec![ip(1, 1, 1, 3)]);
}

#[tokio::test]
async fn test_unconfigured_fallback_is_config_error() {
    let client = Client::builder()
        .main_resolver(Resolver::from_lookup(placeholder_servers(), table([])))
        .fallback_resolver(Resolver::from_lookup(Vec::new(), table([])))
        .build();

    let err = client.lookup_for_request("example.com").await.unwrap_err();
    assert!(matches!(
        err,
        NetError::ResolverNotConfigured { role: ResolverRole::Fallback }
    ));
}

#[tokio::test]
async fn test_both_empty_is_empty_result() {
    let client = client_with(table([]), table([]));
    let addrs = client.lookup_for_request("https://example2.com").await.unwrap();
    assert!(addrs.is_empty());
}

#[tokio::test]
async fn test_scheme_defaults_to_https() {
    let client = client_with(
        table([("example.com", vec![ip(1, 1, 1, 1), ip(2, 2, 2, 2)])]),
        table([]),
    );

    assert_eq!(
        client.lookup_for_request("example.com").await.unwrap(),
        client.lookup_for_request("https://example.com").await.unwrap()
    );
}

#[tokio::test]
async fn test_swapped_resolver_takes_effect() {
    let mut client = client_with(table([("example.com", vec![ip(1, 1, 1, 1)])]), table([]));
    client.set_main_resolver(Resolver::from_lookup(
        placeholder_servers(),
        table([("example.com", vec![ip(4, 4, 4, 4)])]),
    ));

    let addrs = client.lookup_for_request("example.com").await.unwrap();
    assert_eq!(addrs, vec![ip(4, 4, 4, 4)]);
}

// === Failover POST ===

#[tokio::test]
async fn test_post_to_resolved_address() {
    let (addr, seen) = spawn_server("127.0.0.1:0", OK_RESPONSE).await;
    let client = client_with(
        table([("example.com", vec![ip(127, 0, 0, 1)])]),
        table([]),
    );

    let target = format!("http://example.com:{}/submit", addr.port());
    let resp = client
        .failover_post(&target, "application/json", r#"{"hello":"world"}"#)
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.remote_ip(), Some(ip(127, 0, 0, 1)));
    assert_eq!(resp.text().await.unwrap(), "OK");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = requests[0].to_ascii_lowercase();
    assert!(request.starts_with("post /submit http/1.1"));
    assert!(request.contains(&format!("host: example.com:{}", addr.port())));
    assert!(request.contains("content-type: application/json"));
    assert!(requests[0].ends_with(r#"{"hello":"world"}"#));
}

#[tokio::test]
async fn test_unresolvable_host_sends_nothing() {
    let (addr, seen) = spawn_server("127.0.0.1:0", OK_RESPONSE).await;
    let client = client_with(
        table([("example.com", vec![ip(127, 0, 0, 1)])]),
        table([]),
    );

    let target = format!("http://example2.com:{}/", addr.port());
    let err = client
        .failover_post(&target, "application/json", "{}")
        .await
        .unwrap_err();

    match err {
        NetError::CannotResolveHostname { host } => assert_eq!(host, "example2.com"),
        other => panic!("expected CannotResolveHostname, got {other:?}"),
    }
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_error_status_is_still_a_response() {
    let (addr, _seen) = spawn_server(
        "127.0.0.1:0",
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    let client = client_with(table([("example.com", vec![ip(127, 0, 0, 1)])]), table([]));

    let target = format!("http://example.com:{}/", addr.port());
    let resp = client.failover_post(&target, "text/plain", "x").await.unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn test_single_address_failure_is_not_retried() {
    let port = closed_port().await;
    let client = client_with(table([("example.com", vec![ip(127, 0, 0, 1)])]), table([]));

    let target = format!("http://example.com:{port}/");
    let err = client.failover_post(&target, "text/plain", "x").await.unwrap_err();

    // One attempt only: the bare attempt error, not an aggregate
    match err {
        NetError::ConnectionFailedTo { host, port: p, .. } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(p, port);
        }
        other => panic!("expected ConnectionFailedTo, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_timeout_bounds_attempt() {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut client = client_with(table([("example.com", vec![ip(127, 0, 0, 1)])]), table([]));
    client.set_connection_timeout(Duration::from_millis(200));

    let target = format!("http://example.com:{port}/");
    let err = client.failover_post(&target, "text/plain", "x").await.unwrap_err();
    assert!(matches!(err, NetError::RequestTimedOut { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_invalid_target_is_not_attempted() {
    let client = client_with(table([]), table([]));
    let err = client
        .failover_post("http://exa mple.com/", "text/plain", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_concurrent_posts_share_client() {
    let (addr, seen) = spawn_server("127.0.0.1:0", OK_RESPONSE).await;
    let client = client_with(table([("example.com", vec![ip(127, 0, 0, 1)])]), table([]));
    let target = format!("http://example.com:{}/", addr.port());

    let posts = (0..8).map(|i| {
        let client = &client;
        let target = &target;
        async move { client.failover_post(target, "text/plain", format!("req-{i}")).await }
    });
    let results = futures::future::join_all(posts).await;

    for result in results {
        assert_eq!(result.unwrap().status(), 200);
    }
    assert_eq!(seen.lock().unwrap().len(), 8);
}

#[tokio::test]
async fn test_connection_reused_across_posts() {
    let (addr, seen) = spawn_server("127.0.0.1:0", OK_RESPONSE).await;
    let client = Client::builder()
        .idle_timeout(Duration::from_secs(30))
        .resolvers(ResolverPair::new(
            Resolver::from_lookup(
                placeholder_servers(),
                table([("example.com", vec![ip(127, 0, 0, 1)])]),
            ),
            Resolver::from_lookup(placeholder_servers(), table([])),
        ))
        .build();
    let target = format!("http://example.com:{}/", addr.port());

    let resp = client.failover_post(&target, "text/plain", "one").await.unwrap();
    assert_eq!(resp.bytes().await.unwrap(), "OK");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.idle_connections(), 1);

    let resp = client.failover_post(&target, "text/plain", "two").await.unwrap();
    assert_eq!(resp.bytes().await.unwrap(), "OK");
    assert_eq!(seen.lock().unwrap().len(), 2);
}

// Distinct loopback addresses beyond 127.0.0.1 are routable on Linux only.
#[cfg(target_os = "linux")]
mod multi_address {
    use super::*;

    #[tokio::test]
    async fn test_fails_over_to_live_address() {
        let (live, seen) = spawn_server("127.0.0.2:0", OK_RESPONSE).await;
        // Same port on 127.0.0.3 has no listener and refuses
        let client = client_with(
            table([("example.com", vec![ip(127, 0, 0, 3), ip(127, 0, 0, 2)])]),
            table([]),
        );

        let target = format!("http://example.com:{}/", live.port());
        for _ in 0..5 {
            let resp = client.failover_post(&target, "text/plain", "x").await.unwrap();
            assert_eq!(resp.status(), 200);
            assert_eq!(resp.remote_ip(), Some(ip(127, 0, 0, 2)));
        }
        assert_eq!(seen.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_both_addresses_refuse() {
        let port = closed_port().await;
        let addrs = [ip(127, 0, 0, 2), ip(127, 0, 0, 3), ip(127, 0, 0, 4)];
        let client = client_with(table([("example.com", addrs.to_vec())]), table([]));

        let target = format!("http://example.com:{port}/");
        let err = client.failover_post(&target, "text/plain", "x").await.unwrap_err();

        let (first, last) = match &err {
            NetError::AllAttemptsFailed { first, last } => (first.as_ref(), last.as_ref()),
            other => panic!("expected AllAttemptsFailed, got {other:?}"),
        };
        let attempted = |e: &NetError| match e {
            NetError::ConnectionFailedTo { host, .. } => host.parse::<IpAddr>().unwrap(),
            other => panic!("expected ConnectionFailedTo, got {other:?}"),
        };
        let (a, b) = (attempted(first), attempted(last));
        assert_ne!(a, b);
        assert!(addrs.contains(&a));
        assert!(addrs.contains(&b));
        assert!(std::ptr::eq(err.last_attempt(), last));
    }
}
