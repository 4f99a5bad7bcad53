//! webcall-api — HTTP and websocket surface of the signaling server.
//!
//! Everything is served under `/rtcsig`. Crawlers are turned away before
//! routing; every request is traced.

pub mod handlers;
pub mod request;
pub mod ws;

use std::net::SocketAddr;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use handlers::ApiState;
pub use request::RequestContext;

pub fn router(state: ApiState) -> Router {
    let rtcsig = Router::new()
        .route("/mode", get(handlers::handle_mode))
        .route("/login", post(handlers::handle_login))
        .route("/register/{id}", post(handlers::handle_register))
        .route("/avail/{id}", get(handlers::handle_avail))
        .route("/logout", get(handlers::handle_logout))
        .route("/version", get(handlers::handle_version))
        .route("/message", post(handlers::handle_message))
        .route("/online", get(handlers::handle_online))
        .route("/notifyCallee", post(handlers::handle_notify_callee))
        .route("/missedCall", post(handlers::handle_missed_call))
        .route("/dumponline", get(handlers::handle_dump_online))
        .route("/hubinfo", get(handlers::handle_hub_info))
        .route("/ws", get(ws::ws_upgrade))
        .fallback(handlers::handle_unknown)
        .with_state(state);

    Router::new()
        .nest("/rtcsig", rtcsig)
        .layer(middleware::from_fn(request::deny_bots))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: ApiState, bind_addr: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{bind_addr}:{port}")).await?;
    tracing::info!(addr = bind_addr, port, "signaling listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
