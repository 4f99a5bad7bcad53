use crate::*;
use tokio::sync::mpsc;

#[tokio::test]
async fn hubinfo_is_sorted() {
    let server = start_server().await;
    server.core.hubs.get_or_create("bob");
    server
        .core
        .hubs
        .get_or_create("alice")
        .set_connected_caller_ip("198.51.100.4");

    let body = server.get_text("/hubinfo", None).await.unwrap();
    assert_eq!(body, "alice caller: 198.51.100.4\nbob idle\n");
}

#[tokio::test]
async fn dumponline_lists_bound_hubs() {
    let server = start_server().await;
    let (tx, _rx) = mpsc::unbounded_channel();
    let connected = server
        .core
        .connect_callee("alice", "192.0.2.1:4000", "test-ua", tx);

    let body = server.get_text("/dumponline", None).await.unwrap();
    let line = body.lines().next().unwrap();
    assert!(line.starts_with("online alice"), "{line}");
    assert!(line.contains("ip=192.0.2.1:4000"));
    assert!(line.contains(&format!("wsCli={}", connected.client.id())));
    assert!(line.ends_with("ua=test-ua"));
}

#[tokio::test]
async fn dumps_refuse_remote_callers() {
    let server = start_server().await;
    for path in ["/hubinfo", "/dumponline"] {
        let resp = server
            .http
            .get(format!("{}{path}", server.base_url))
            .header("X-Real-IP", "203.0.113.9")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 403, "{path}");
    }
}

#[tokio::test]
async fn configured_admin_address_is_allowed() {
    let server = start_server_with(ServerConfig {
        admin_addrs: vec!["203.0.113.9".to_string()],
        ..ServerConfig::default()
    })
    .await;
    let resp = server
        .http
        .get(format!("{}/hubinfo", server.base_url))
        .header("X-Real-IP", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn real_ip_is_ignored_from_untrusted_peer() {
    let server = start_server_with(ServerConfig {
        trusted_proxies: Vec::new(),
        ..ServerConfig::default()
    })
    .await;
    // The header is not believed, so the loopback socket decides.
    let resp = server
        .http
        .get(format!("{}/hubinfo", server.base_url))
        .header("X-Real-IP", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}
