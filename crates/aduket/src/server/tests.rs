use super::*;
use crate::rule::{corrupt_body, status_code, string_body, timeout};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing_test::traced_test;

#[tokio::test]
async fn test_binds_ephemeral_loopback_port() {
    let (server, _recorder) = Server::new(Method::GET, "/", [status_code(200)])
        .await
        .unwrap();

    assert!(server.addr().ip().is_loopback());
    assert_ne!(server.addr().port(), 0);
    assert_eq!(server.url(), format!("http://{}", server.addr()));
    assert_eq!(
        server.url_for("/user/1"),
        format!("http://{}/user/1", server.addr())
    );
    server.close().await;
}

#[tokio::test]
async fn test_two_servers_get_distinct_ports() {
    let (a, _) = Server::new(Method::GET, "/", [status_code(200)]).await.unwrap();
    let (b, _) = Server::new(Method::GET, "/", [status_code(200)]).await.unwrap();
    assert_ne!(a.addr(), b.addr());
}

#[tokio::test]
async fn test_construction_errors_surface_before_binding() {
    let err = Server::new(Method::GET, "/", [status_code(99)])
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Rule { .. }));

    let err = Server::new(Method::GET, "no-slash", [status_code(200)]).await.unwrap_err();
    assert!(matches!(err, ServerError::InvalidRoute { .. }));
}

#[tokio::test]
async fn test_bind_error_is_reported() {
    let (server, _) = Server::new(Method::GET, "/", [status_code(200)]).await.unwrap();
    let config = ServerConfig {
        host: server.addr().ip(),
        port: server.addr().port(),
    };

    let err = Server::with_config(config, RouteTable::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::BindError(addr, _) if addr == server.addr()));
}

#[tokio::test]
async fn test_close_stops_accepting() {
    let (server, recorder) = Server::new(Method::GET, "/ping", [string_body("pong")])
        .await
        .unwrap();
    let url = server.url_for("/ping");

    let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert_eq!(body, "pong");

    server.close().await;
    assert!(reqwest::get(&url).await.is_err());
    assert_eq!(recorder.request_count(), 1);
}

#[tokio::test]
async fn test_close_does_not_wait_for_delayed_responses() {
    let (server, recorder) = Server::new(
        Method::GET,
        "/slow",
        [timeout(Duration::from_secs(30))],
    )
    .await
    .unwrap();
    let url = server.url_for("/slow");
    let pending = tokio::spawn(async move { reqwest::get(&url).await });

    while !recorder.received() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::timeout(Duration::from_secs(5), server.close())
        .await
        .unwrap();

    assert!(pending.await.unwrap().is_err());
}

#[tokio::test]
async fn test_corrupt_body_announces_length_it_never_sends() {
    let (server, recorder) = Server::new(Method::GET, "/broken", [corrupt_body()])
        .await
        .unwrap();

    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    stream
        .write_all(b"GET /broken HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();

    let raw = String::from_utf8(raw).unwrap().to_ascii_lowercase();
    assert!(raw.starts_with("http/1.1 200 ok\r\n"), "{raw}");
    assert!(raw.contains("\r\ncontent-length: 1\r\n"), "{raw}");
    // The head is the whole payload: the announced byte never arrives.
    assert!(raw.ends_with("\r\n\r\n"), "{raw}");
    assert!(recorder.received());
}

#[tokio::test]
async fn test_drop_shuts_server_down() {
    let (server, _) = Server::new(Method::GET, "/", [status_code(200)]).await.unwrap();
    let url = server.url();
    drop(server);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(reqwest::get(&url).await.is_err());
}

#[traced_test]
#[tokio::test]
async fn test_lifecycle_and_dispatch_are_logged() {
    let (server, _) = Server::new(Method::GET, "/user/:id", [status_code(200)])
        .await
        .unwrap();
    reqwest::get(server.url_for("/user/1")).await.unwrap();
    reqwest::get(server.url_for("/nowhere")).await.unwrap();
    server.close().await;

    assert!(logs_contain("Test server bound to 127.0.0.1:"));
    assert!(logs_contain("GET /user/1 -> GET /user/:id"));
    assert!(logs_contain("GET /nowhere -> no route"));
    assert!(logs_contain("closed"));
}
