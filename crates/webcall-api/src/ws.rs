//! Callee websocket: one connection per logged-in callee.
//!
//! The socket is split; a writer task drains the client's outbound queue
//! while the reader loop waits for the peer to go away.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::handlers::ApiState;
use crate::request::RequestContext;

/// GET /rtcsig/ws
///
/// Only a callee holding a valid session cookie is upgraded.
pub async fn ws_upgrade(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let ctx = state.context(peer, &headers, &query);
    if !ctx.session.cookie_valid || ctx.session.callee_id.is_empty() {
        tracing::warn!(
            url_id = %ctx.session.url_id,
            rip = %ctx.remote_addr,
            "websocket refused, no valid session"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| run_connection(socket, state, ctx))
}

async fn run_connection(socket: WebSocket, state: ApiState, ctx: RequestContext) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connected = state.core.connect_callee(
        &ctx.session.callee_id,
        &ctx.remote_addr_with_port,
        &ctx.user_agent,
        tx,
    );
    let id = connected.client.id();

    let (waiting, missed) = state.core.push_backlog(&connected.hub);
    for result in [waiting, missed] {
        if let Err(e) = result {
            tracing::warn!(callee = %ctx.session.callee_id, conn = %id, error = %e, "backlog push on connect failed");
        }
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn = %id, error = %e, "websocket read error");
                break;
            }
        }
    }

    state.core.disconnect(id);
    writer.abort();
}
