//! Signaling context that owns the registries handlers share.
//!
//! Connection lifecycle:
//!   connect:    allocate id → register client → bind to callee hub
//!   disconnect: release id → unbind from hub if still bound
//!
//! Both teardown steps are idempotent, so every close path may call
//! `disconnect` without coordination.

use std::sync::Arc;

use webcall_core::config::SessionConfig;
use webcall_core::ConnectionId;

use crate::accounts::Accounts;
use crate::backlog::Backlog;
use crate::client::{Client, ClientRegistry, Outbound};
use crate::credentials::CredentialStore;
use crate::hub::{Hub, HubRegistry};
use crate::notify::{self, Delivery, NotifyError};
use crate::resolver::SessionResolver;

#[derive(Clone)]
pub struct SignalCore {
    pub clients: ClientRegistry,
    pub hubs: HubRegistry,
    pub resolver: Arc<SessionResolver>,
    pub accounts: Arc<Accounts>,
    pub backlog: Backlog,
}

/// A freshly bound callee connection.
pub struct Connected {
    pub client: Arc<Client>,
    pub hub: Arc<Hub>,
    /// The connection this one displaced, if any.
    pub replaced: Option<Arc<Client>>,
}

impl SignalCore {
    pub fn new(store: Arc<dyn CredentialStore>, config: &SessionConfig) -> Self {
        Self::with_clients(ClientRegistry::new(), store, config)
    }

    /// Use a prepared client registry (e.g. with a scripted id source).
    pub fn with_clients(
        clients: ClientRegistry,
        store: Arc<dyn CredentialStore>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            clients,
            hubs: HubRegistry::new(),
            accounts: Arc::new(Accounts::new(store.clone(), config)),
            resolver: Arc::new(SessionResolver::new(store, config)),
            backlog: Backlog::new(),
        }
    }

    /// Register a new connection for `callee_id` and make it the hub's live
    /// connection.
    pub fn connect_callee(
        &self,
        callee_id: &str,
        remote_addr: &str,
        user_agent: &str,
        tx: Outbound,
    ) -> Connected {
        let client = self.clients.register(remote_addr, user_agent, tx);
        let hub = self.hubs.get_or_create(callee_id);
        let replaced = hub.bind(client.clone());
        tracing::info!(
            callee = callee_id,
            conn = %client.id(),
            addr = remote_addr,
            replaced = replaced.is_some(),
            "callee connected"
        );
        Connected {
            client,
            hub,
            replaced,
        }
    }

    /// Tear down connection `id`. Safe to call repeatedly.
    pub fn disconnect(&self, id: ConnectionId) {
        let Some(client) = self.clients.release(id) else {
            return;
        };
        // Registry lock is already dropped; the hub lock is taken on its own.
        if let Some(callee_id) = client.hub() {
            if let Some(hub) = self.hubs.lookup(&callee_id) {
                if hub.unbind_client(id) {
                    tracing::info!(callee = %callee_id, conn = %id, "callee disconnected");
                }
            }
        }
    }

    /// Hand queued waiting callers to the callee. Delivered callers leave
    /// the queue; on failure they are put back.
    pub fn deliver_waiting(&self, hub: &Hub) -> Result<Delivery, NotifyError> {
        let waiting = self.backlog.take_waiting(hub.callee_id());
        let result = notify::notify_waiting_callers(hub, &waiting);
        if result.is_err() {
            self.backlog.requeue_waiting(hub.callee_id(), waiting);
        }
        result
    }

    /// Push the callee's queued waiting callers and missed-call history.
    pub fn push_backlog(
        &self,
        hub: &Hub,
    ) -> (Result<Delivery, NotifyError>, Result<Delivery, NotifyError>) {
        let missed = self.backlog.missed(hub.callee_id());
        (
            self.deliver_waiting(hub),
            notify::notify_missed_calls(hub, &missed),
        )
    }
}
