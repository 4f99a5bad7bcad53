//! Hubs bind a callee id to its current live connection.
//!
//! Two lock levels:
//! - the registry map guards callee id → hub (creation and removal only)
//! - each hub guards its own fields (bound client, caller ip, user agent)
//!
//! Handlers resolve the hub through the map, drop the map guard, then lock
//! the hub. Unrelated callees never contend on a hub lock.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use webcall_core::ConnectionId;

use crate::client::Client;

/// Call state for one callee. Survives reconnects.
#[derive(Debug)]
pub struct Hub {
    callee_id: String,
    state: RwLock<HubState>,
}

#[derive(Debug, Default)]
struct HubState {
    bound: Option<Arc<Client>>,
    connected_caller_ip: String,
    callee_user_agent: String,
}

/// Point-in-time view of a hub, for status and dump output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSnapshot {
    pub callee_id: String,
    pub client_id: Option<ConnectionId>,
    pub client_addr: String,
    pub connected_caller_ip: String,
    /// Bound client's user agent, or the last one seen.
    pub user_agent: String,
}

impl Hub {
    fn new(callee_id: String) -> Self {
        Self {
            callee_id,
            state: RwLock::new(HubState::default()),
        }
    }

    pub fn callee_id(&self) -> &str {
        &self.callee_id
    }

    /// Bind `client` as the callee's live connection.
    ///
    /// A previously bound client is detached and returned; it is not closed.
    pub fn bind(&self, client: Arc<Client>) -> Option<Arc<Client>> {
        let mut state = self.state.write();
        if !client.user_agent().is_empty() {
            state.callee_user_agent = client.user_agent().to_string();
        }
        client.set_hub(Some(self.callee_id.clone()));
        let previous = state.bound.replace(client.clone());
        match previous {
            Some(prev) if prev.id() != client.id() => {
                prev.set_hub(None);
                tracing::info!(
                    callee = %self.callee_id,
                    old = %prev.id(),
                    new = %client.id(),
                    "hub rebound to new connection"
                );
                Some(prev)
            }
            _ => None,
        }
    }

    /// Detach whatever client is bound. Idempotent.
    pub fn unbind(&self) -> Option<Arc<Client>> {
        let prev = self.state.write().bound.take();
        if let Some(client) = &prev {
            client.set_hub(None);
        }
        prev
    }

    /// Detach the bound client only if it is `id`. A newer connection that
    /// already replaced it stays bound.
    pub fn unbind_client(&self, id: ConnectionId) -> bool {
        let mut state = self.state.write();
        match &state.bound {
            Some(client) if client.id() == id => {
                client.set_hub(None);
                state.bound = None;
                true
            }
            _ => false,
        }
    }

    pub fn bound_client(&self) -> Option<Arc<Client>> {
        self.state.read().bound.clone()
    }

    pub fn is_online(&self) -> bool {
        self.state.read().bound.is_some()
    }

    /// Record the caller currently engaged with this callee. Empty = idle.
    /// Called by the caller-side relay; this server only reads the value.
    pub fn set_connected_caller_ip(&self, ip: impl Into<String>) {
        self.state.write().connected_caller_ip = ip.into();
    }

    pub fn connected_caller_ip(&self) -> String {
        self.state.read().connected_caller_ip.clone()
    }

    /// Last known callee user agent, kept across disconnects.
    pub fn callee_user_agent(&self) -> String {
        self.state.read().callee_user_agent.clone()
    }

    pub fn snapshot(&self) -> HubSnapshot {
        let state = self.state.read();
        let (client_id, client_addr, user_agent) = match &state.bound {
            Some(c) if !c.user_agent().is_empty() => {
                (Some(c.id()), c.remote_addr().to_string(), c.user_agent().to_string())
            }
            Some(c) => (
                Some(c.id()),
                c.remote_addr().to_string(),
                state.callee_user_agent.clone(),
            ),
            None => (None, String::new(), state.callee_user_agent.clone()),
        };
        HubSnapshot {
            callee_id: self.callee_id.clone(),
            client_id,
            client_addr,
            connected_caller_ip: state.connected_caller_ip.clone(),
            user_agent,
        }
    }
}

/// Registry of hubs keyed by callee id. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct HubRegistry {
    hubs: Arc<DashMap<String, Arc<Hub>>>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self {
            hubs: Arc::new(DashMap::new()),
        }
    }

    /// Get the hub for `callee_id`, creating it on first reference.
    pub fn get_or_create(&self, callee_id: &str) -> Arc<Hub> {
        if let Some(hub) = self.hubs.get(callee_id) {
            return hub.value().clone();
        }
        self.hubs
            .entry(callee_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(callee = callee_id, "hub created");
                Arc::new(Hub::new(callee_id.to_string()))
            })
            .value()
            .clone()
    }

    pub fn lookup(&self, callee_id: &str) -> Option<Arc<Hub>> {
        self.hubs.get(callee_id).map(|h| h.value().clone())
    }

    /// Tear down a hub. Its bound client, if any, is detached.
    pub fn remove(&self, callee_id: &str) -> Option<Arc<Hub>> {
        let (_, hub) = self.hubs.remove(callee_id)?;
        hub.unbind();
        tracing::info!(callee = callee_id, "hub removed");
        Some(hub)
    }

    /// Visit every hub under the map's shared lock. The visitor must not
    /// call back into this registry.
    pub fn for_each(&self, mut visit: impl FnMut(&str, &Hub)) {
        for entry in self.hubs.iter() {
            visit(entry.key(), entry.value());
        }
    }

    /// Snapshots of all hubs, sorted by callee id.
    pub fn snapshots(&self) -> Vec<HubSnapshot> {
        let mut out = Vec::with_capacity(self.hubs.len());
        self.for_each(|_, hub| out.push(hub.snapshot()));
        out.sort_by(|a, b| a.callee_id.cmp(&b.callee_id));
        out
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}
