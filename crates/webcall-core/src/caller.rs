//! Backlog records describing a caller.

use serde::{Deserialize, Serialize};

/// A caller who is waiting live, or who called while the callee was
/// unreachable.
///
/// Field names on the wire match what the web client reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerInfo {
    /// Caller's `ip:port` as seen by the server.
    #[serde(rename = "AddrPort", default)]
    pub addr_port: String,
    #[serde(rename = "CallerName", default)]
    pub caller_name: String,
    /// Unix seconds.
    #[serde(rename = "CallTime", default)]
    pub call_time: i64,
    #[serde(rename = "CallerID", default)]
    pub caller_id: String,
}

impl CallerInfo {
    pub fn new(addr_port: impl Into<String>, caller_name: impl Into<String>, call_time: i64) -> Self {
        Self {
            addr_port: addr_port.into(),
            caller_name: caller_name.into(),
            call_time,
            caller_id: String::new(),
        }
    }
}
