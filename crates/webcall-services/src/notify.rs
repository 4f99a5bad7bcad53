//! Pushes caller backlogs to a connected callee.
//!
//! Each push is one `<tag>|<json array>` text frame written to the hub's
//! bound client. An empty list writes nothing. A hub without a bound client
//! is a delivery failure; nothing is retried here.

use webcall_core::{CallerInfo, ConnectionId, Frame, FrameError, FrameTag};

use crate::hub::Hub;

/// What a push did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued on the given connection.
    Sent(ConnectionId),
    /// Nothing to send.
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("callee {0} has no live connection")]
    NoClient(String),
    #[error("connection {0} closed before delivery")]
    Closed(ConnectionId),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub fn notify_waiting_callers(hub: &Hub, callers: &[CallerInfo]) -> Result<Delivery, NotifyError> {
    push(hub, FrameTag::WaitingCallers, callers)
}

pub fn notify_missed_calls(hub: &Hub, calls: &[CallerInfo]) -> Result<Delivery, NotifyError> {
    push(hub, FrameTag::MissedCalls, calls)
}

fn push(hub: &Hub, tag: FrameTag, items: &[CallerInfo]) -> Result<Delivery, NotifyError> {
    if items.is_empty() {
        return Ok(Delivery::Empty);
    }
    let frame = Frame::from_items(tag, items).map_err(|e| {
        tracing::warn!(callee = hub.callee_id(), %tag, error = %e, "failed to encode backlog");
        e
    })?;
    // The hub lock is released here; the write happens on a cloned handle.
    let Some(client) = hub.bound_client() else {
        tracing::warn!(callee = hub.callee_id(), %tag, "cannot push backlog, callee not connected");
        return Err(NotifyError::NoClient(hub.callee_id().to_string()));
    };
    client.write(frame.encode()).map_err(|e| {
        tracing::warn!(callee = hub.callee_id(), %tag, error = %e, "backlog push failed");
        NotifyError::Closed(e.0)
    })?;
    tracing::debug!(callee = hub.callee_id(), %tag, count = items.len(), conn = %client.id(), "backlog pushed");
    Ok(Delivery::Sent(client.id()))
}
