//! Live client connections keyed by connection identifier.
//!
//! Identifier generation and registration run under the same write lock, so
//! two connections accepted at once can never draw the same id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use webcall_core::ConnectionId;

use crate::identifier::{self, IdSource, RandomIds};

/// Sender half of a connection's outbound text queue.
pub type Outbound = mpsc::UnboundedSender<String>;

/// A single live connection.
#[derive(Debug)]
pub struct Client {
    id: ConnectionId,
    remote_addr: String,
    user_agent: String,
    /// Callee id of the hub this client is bound to. Resolved through the
    /// hub registry on demand; never an owning reference.
    hub: RwLock<Option<String>>,
    tx: Outbound,
}

#[derive(Debug, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnectionClosed(pub ConnectionId);

impl Client {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Callee id of the owning hub, if bound.
    pub fn hub(&self) -> Option<String> {
        self.hub.read().clone()
    }

    pub(crate) fn set_hub(&self, callee_id: Option<String>) {
        *self.hub.write() = callee_id;
    }

    /// Queue `text` for the connection's writer. Never blocks.
    pub fn write(&self, text: String) -> Result<(), ConnectionClosed> {
        self.tx.send(text).map_err(|_| ConnectionClosed(self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct ClientTable {
    clients: HashMap<ConnectionId, Arc<Client>>,
    ids: Box<dyn IdSource>,
}

/// Registry of live clients. Cloning shares the underlying table.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<RwLock<ClientTable>>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::with_source(Box::new(RandomIds::from_entropy()))
    }

    /// Use a specific random source for identifier generation.
    pub fn with_source(ids: Box<dyn IdSource>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClientTable {
                clients: HashMap::new(),
                ids,
            })),
        }
    }

    /// Allocate a fresh identifier and register a client under it.
    pub fn register(
        &self,
        remote_addr: impl Into<String>,
        user_agent: impl Into<String>,
        tx: Outbound,
    ) -> Arc<Client> {
        let mut table = self.inner.write();
        let ClientTable { clients, ids } = &mut *table;
        let id = identifier::allocate(&mut **ids, clients);
        let client = Arc::new(Client {
            id,
            remote_addr: remote_addr.into(),
            user_agent: user_agent.into(),
            hub: RwLock::new(None),
            tx,
        });
        clients.insert(id, client.clone());
        tracing::debug!(id = %id, live = clients.len(), "client registered");
        client
    }

    pub fn lookup(&self, id: ConnectionId) -> Option<Arc<Client>> {
        self.inner.read().clients.get(&id).cloned()
    }

    /// Remove a client. Releasing an unknown id is a no-op.
    pub fn release(&self, id: ConnectionId) -> Option<Arc<Client>> {
        let removed = self.inner.write().clients.remove(&id);
        if removed.is_some() {
            tracing::debug!(id = %id, "client released");
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.read().clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of live identifiers.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.inner.read().clients.keys().copied().collect()
    }
}
