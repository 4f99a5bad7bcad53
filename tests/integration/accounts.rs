use crate::*;

#[tokio::test]
async fn register_login_and_connect() {
    let server = start_server().await;

    assert_eq!(server.get_text("/avail/alice", None).await.unwrap(), "avail");
    let (cookie, body) = server.post_password("/register/alice", "secret1").await.unwrap();
    assert_eq!(body, "ok");
    let cookie = cookie.expect("register sets a session cookie");
    assert!(cookie.starts_with("webcallid=alice&"));
    assert_eq!(server.get_text("/avail/alice", None).await.unwrap(), "notavail");

    // A fresh login issues a working cookie too.
    let (login_cookie, body) = server.post_password("/login?id=alice", "secret1").await.unwrap();
    assert_eq!(body, "ok");
    let login_cookie = login_cookie.unwrap();
    assert_eq!(
        server.get_text("/mode?id=alice", Some(&login_cookie)).await.unwrap(),
        "normal|ok"
    );

    let _ws = server.connect_ws(Some(&login_cookie)).await.unwrap();
    assert!(server.wait_for_status("alice", "online").await.unwrap());
}

#[tokio::test]
async fn login_refusals() {
    let server = start_server().await;
    let (_, body) = server.post_password("/login?id=alice", "secret1").await.unwrap();
    assert_eq!(body, "notregistered");

    server.post_password("/register/alice", "secret1").await.unwrap();
    let (cookie, body) = server.post_password("/login?id=alice", "wrong12").await.unwrap();
    assert_eq!(body, "wrongpw");
    assert!(cookie.is_none());

    let (_, body) = server.post_password("/register/alice", "other12").await.unwrap();
    assert_eq!(body, "notavail");
}

#[tokio::test]
async fn nocookie_login_sets_no_cookie() {
    let server = start_server().await;
    server.post_password("/register/alice", "secret1").await.unwrap();
    let (cookie, body) = server
        .post_password("/login?id=alice&nocookie", "secret1")
        .await
        .unwrap();
    assert_eq!(body, "ok");
    assert!(cookie.is_none());
}
