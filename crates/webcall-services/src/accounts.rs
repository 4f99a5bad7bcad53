//! Callee accounts: registration, password check and session issue.
//!
//! An account is a `PwIdCombo` stored under the callee id in the account
//! bucket. The password is kept as a keyed BLAKE3 digest bound to the
//! callee id; that digest is also the hashed password carried in the
//! session cookie.

use std::sync::Arc;

use webcall_core::config::SessionConfig;

use crate::credentials::{CredentialStore, PwIdCombo, StoreError};
use crate::resolver::SessionResolver;

const PASSWORD_CONTEXT: &str = "webcall account password v1";
const MAX_ID_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid callee id {0:?}")]
    InvalidId(String),
    #[error("password too short")]
    WeakPassword,
    #[error("callee id {0} is taken")]
    Taken(String),
    #[error("callee id {0} is not registered")]
    NotRegistered(String),
    #[error("wrong password for {0}")]
    WrongPassword(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn hash_password(callee_id: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(callee_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub struct Accounts {
    store: Arc<dyn CredentialStore>,
    bucket: String,
    reserved_prefix: String,
}

impl Accounts {
    pub fn new(store: Arc<dyn CredentialStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            bucket: config.account_bucket.clone(),
            reserved_prefix: config.reserved_prefix.clone(),
        }
    }

    /// Lower-case letters, digits, `.`, `_` and `-`. The reserved prefix is
    /// not open for registration.
    pub fn is_valid_id(&self, callee_id: &str) -> bool {
        !callee_id.is_empty()
            && callee_id.len() <= MAX_ID_LEN
            && callee_id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"._-".contains(&b))
            && (self.reserved_prefix.is_empty() || !callee_id.starts_with(&self.reserved_prefix))
    }

    pub fn exists(&self, callee_id: &str) -> Result<bool, StoreError> {
        match self.store.get(&self.bucket, callee_id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create an account. Returns the stored password digest.
    pub fn register(&self, callee_id: &str, password: &str) -> Result<String, AccountError> {
        if !self.is_valid_id(callee_id) {
            return Err(AccountError::InvalidId(callee_id.to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AccountError::WeakPassword);
        }
        if self.exists(callee_id)? {
            return Err(AccountError::Taken(callee_id.to_string()));
        }
        let hashed = hash_password(callee_id, password);
        self.store.put(
            &self.bucket,
            callee_id,
            PwIdCombo {
                callee_id: callee_id.to_string(),
                pw: hashed.clone(),
            },
        )?;
        tracing::info!(callee = callee_id, "account registered");
        Ok(hashed)
    }

    /// Check a password. Returns the stored digest on success.
    pub fn verify(&self, callee_id: &str, password: &str) -> Result<String, AccountError> {
        let record = match self.store.get(&self.bucket, callee_id) {
            Ok(r) => r,
            Err(StoreError::NotFound { .. }) => {
                return Err(AccountError::NotRegistered(callee_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if record.pw.is_empty() || record.pw != hash_password(callee_id, password) {
            tracing::info!(callee = callee_id, "login with wrong password");
            return Err(AccountError::WrongPassword(callee_id.to_string()));
        }
        Ok(record.pw)
    }

    /// Verify and issue a session cookie. Returns the `Set-Cookie` value.
    pub fn login(
        &self,
        resolver: &SessionResolver,
        callee_id: &str,
        password: &str,
    ) -> Result<String, AccountError> {
        let hashed = self.verify(callee_id, password)?;
        Ok(resolver.issue(callee_id, &hashed)?)
    }
}
