use crate::*;

#[tokio::test]
async fn mode_is_normal_without_cookie() {
    let server = start_server().await;
    let body = server.get_text("/mode?id=alice", None).await.unwrap();
    assert_eq!(body, "normal");
}

#[tokio::test]
async fn mode_reports_owner_session() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");

    let body = server.get_text("/mode?id=alice", Some(&cookie)).await.unwrap();
    assert_eq!(body, "normal|ok");

    // Someone else's page is not owned by this session.
    let body = server.get_text("/mode?id=bob", Some(&cookie)).await.unwrap();
    assert_eq!(body, "normal");
}

#[tokio::test]
async fn unknown_cookie_is_not_a_session() {
    let server = start_server().await;
    let body = server
        .get_text("/mode?id=alice", Some("webcallid=alice&forged"))
        .await
        .unwrap();
    assert_eq!(body, "normal");
}

#[tokio::test]
async fn maintenance_mode_wins() {
    let server = start_server_with(ServerConfig {
        maintenance_mode: true,
        ..ServerConfig::default()
    })
    .await;
    let cookie = server.login("alice", "hash1");
    let body = server.get_text("/mode?id=alice", Some(&cookie)).await.unwrap();
    assert_eq!(body, "maintenance");
}

#[tokio::test]
async fn logout_deletes_record_and_clears_cookie() {
    let server = start_server().await;
    let cookie = server.login("alice", "hash1");

    let resp = server
        .http
        .get(format!("{}/logout?id=alice", server.base_url))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("webcallid=;"), "{set_cookie}");
    assert!(set_cookie.contains("Thu, 01 Jan 1970 00:00:00 GMT"));
    assert_eq!(resp.text().await.unwrap(), "ok");

    let body = server.get_text("/mode?id=alice", Some(&cookie)).await.unwrap();
    assert_eq!(body, "normal");

    // A second logout finds nothing but still clears the cookie.
    let resp = server
        .http
        .get(format!("{}/logout?id=alice", server.base_url))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("set-cookie").is_some());
    assert_eq!(resp.text().await.unwrap(), "");
}

#[tokio::test]
async fn crawlers_get_an_empty_answer() {
    let server = start_server().await;
    let resp = server
        .http
        .get(format!("{}/mode?id=alice", server.base_url))
        .header("User-Agent", "Googlebot/2.1")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "");
}

#[tokio::test]
async fn version_lists_build() {
    let server = start_server().await;
    let body = server.get_text("/version", None).await.unwrap();
    assert!(body.starts_with("version "), "{body}");
    assert!(body.contains("\nbuilddate "));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let server = start_server().await;
    let resp = server
        .http
        .get(format!("{}/nope", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
