use crate::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use webcall_core::{CallerInfo, Frame, FrameTag};

async fn next_frame(ws: &mut WsStream) -> Frame {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(_) = msg {
            return Frame::decode(msg.to_text().unwrap()).unwrap();
        }
    }
}

#[tokio::test]
async fn websocket_requires_session() {
    let server = start_server().await;
    assert!(server.connect_ws(None).await.is_err());
    assert!(server
        .connect_ws(Some("webcallid=alice&forged"))
        .await
        .is_err());
    assert!(server.core.clients.is_empty());
}

#[tokio::test]
async fn backlog_is_pushed_on_connect() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");
    server
        .core
        .backlog
        .add_missed("alice", CallerInfo::new("198.51.100.4:5000", "bob", 1_700_000_000));

    let mut ws = server.connect_ws(Some(&cookie)).await.unwrap();
    let frame = next_frame(&mut ws).await;
    assert_eq!(frame.tag, FrameTag::MissedCalls);
    let calls: Vec<CallerInfo> = serde_json::from_str(&frame.payload).unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].caller_name, "bob");

    assert!(server.wait_for_status("alice", "online").await.unwrap());
}

#[tokio::test]
async fn notify_callee_reaches_live_connection() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");
    let mut ws = server.connect_ws(Some(&cookie)).await.unwrap();
    assert!(server.wait_for_status("alice", "online").await.unwrap());

    let resp = server
        .http
        .post(format!("{}/notifyCallee?id=alice", server.base_url))
        .json(&serde_json::json!({ "CallerName": "carol" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "ok");

    let frame = next_frame(&mut ws).await;
    assert_eq!(frame.tag, FrameTag::WaitingCallers);
    let waiting: Vec<CallerInfo> = serde_json::from_str(&frame.payload).unwrap();
    assert_eq!(waiting[0].caller_name, "carol");
    assert!(waiting[0].addr_port.starts_with("127.0.0.1:"));
    assert!(waiting[0].call_time > 0);
}

#[tokio::test]
async fn missed_call_is_kept_while_offline() {
    let server = start_server().await;
    let resp = server
        .http
        .post(format!("{}/missedCall?id=alice", server.base_url))
        .json(&serde_json::json!({ "CallerName": "dave", "CallTime": 42 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "ok");
    assert_eq!(server.core.backlog.missed("alice").len(), 1);

    let cookie = server.login("alice", "hash1");
    let mut ws = server.connect_ws(Some(&cookie)).await.unwrap();
    let frame = next_frame(&mut ws).await;
    assert_eq!(frame.tag, FrameTag::MissedCalls);
    assert!(frame.payload.contains(r#""CallTime":42"#));
}

#[tokio::test]
async fn close_takes_callee_offline() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");
    let mut ws = server.connect_ws(Some(&cookie)).await.unwrap();
    assert!(server.wait_for_status("alice", "online").await.unwrap());

    ws.send(Message::Close(None)).await.unwrap();
    assert!(server.wait_for_status("alice", "offline").await.unwrap());
    assert!(server.core.clients.is_empty());
}

#[tokio::test]
async fn reconnect_replaces_older_connection() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");
    let mut first = server.connect_ws(Some(&cookie)).await.unwrap();
    assert!(server.wait_for_status("alice", "online").await.unwrap());
    let mut second = server.connect_ws(Some(&cookie)).await.unwrap();

    // Wait until the hub points at the newer connection.
    for _ in 0..50 {
        if server.core.clients.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // The stale socket going away must not unbind the live one.
    first.send(Message::Close(None)).await.unwrap();
    for _ in 0..50 {
        if server.core.clients.len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.get_text("/online?id=alice", None).await.unwrap(), "online");

    server
        .http
        .post(format!("{}/missedCall?id=alice", server.base_url))
        .json(&serde_json::json!({ "CallerName": "erin" }))
        .send()
        .await
        .unwrap();
    let frame = next_frame(&mut second).await;
    assert_eq!(frame.tag, FrameTag::MissedCalls);
}

#[tokio::test]
async fn delivered_waiting_callers_are_not_resent() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");
    for name in ["c0", "c1"] {
        server
            .http
            .post(format!("{}/notifyCallee?id=alice", server.base_url))
            .json(&serde_json::json!({ "CallerName": name }))
            .send()
            .await
            .unwrap();
    }

    let mut ws = server.connect_ws(Some(&cookie)).await.unwrap();
    let frame = next_frame(&mut ws).await;
    assert_eq!(frame.tag, FrameTag::WaitingCallers);
    let waiting: Vec<CallerInfo> = serde_json::from_str(&frame.payload).unwrap();
    assert_eq!(waiting.len(), 2);
    ws.send(Message::Close(None)).await.unwrap();
    assert!(server.wait_for_status("alice", "offline").await.unwrap());

    let mut ws = server.connect_ws(Some(&cookie)).await.unwrap();
    assert!(server.wait_for_status("alice", "online").await.unwrap());
    let quiet = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(quiet.is_err(), "no backlog expected on reconnect");
    assert!(server.core.backlog.waiting("alice").is_empty());
}
