//! webcall-services — registries, session resolution and backlog delivery.

pub mod accounts;
pub mod backlog;
pub mod client;
pub mod credentials;
pub mod hub;
pub mod identifier;
pub mod notify;
pub mod resolver;
pub mod signal;

pub use accounts::{hash_password, AccountError, Accounts};
pub use backlog::Backlog;
pub use client::{Client, ClientRegistry, ConnectionClosed, Outbound};
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, PwIdCombo, StoreError,
};
pub use hub::{Hub, HubRegistry, HubSnapshot};
pub use identifier::{IdSource, RandomIds};
pub use notify::{notify_missed_calls, notify_waiting_callers, Delivery, NotifyError};
pub use resolver::{Logout, RequestIdentity, Session, SessionResolver};
pub use signal::{Connected, SignalCore};
