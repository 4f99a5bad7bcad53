//! Works out which callee a request belongs to.
//!
//! Inputs are the `Cookie` header, the `id` query parameter and the
//! `Referer`. Precedence:
//!
//! 1. urlID from `?id=` (lower-cased), else from a `/user/` or `/button/`
//!    referer segment (verbatim)
//! 2. provisional calleeID from a `/callee/` referer segment (lower-cased)
//! 3. cookie name from urlID
//! 4. no cookie, or no `&` in it: anonymous
//! 5. a non-empty cookie prefix becomes the calleeID
//! 6. a referer calleeID that disagrees with the cookie voids the cookie
//! 7. the full cookie value must map to a stored record for the same callee
//!    with a non-empty password
//!
//! Every failure downgrades to an anonymous session. None of them abort the
//! request.

use std::sync::Arc;

use webcall_core::config::SessionConfig;
use webcall_core::cookie::{self, CookieValue};

use crate::credentials::{CredentialStore, PwIdCombo, StoreError};

const CALLEE_SEGMENT: &str = "/callee/";
const USER_SEGMENT: &str = "/user/";
const BUTTON_SEGMENT: &str = "/button/";

/// Identity-bearing fields of one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdentity<'a> {
    pub cookie_header: Option<&'a str>,
    pub query_id: Option<&'a str>,
    pub referer: Option<&'a str>,
}

/// Outcome of resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub callee_id: String,
    /// The id named by the request. Usually another party's.
    pub url_id: String,
    /// Stored password. Empty unless `cookie_valid`.
    pub password: String,
    pub cookie_valid: bool,
    /// Cookie name consulted for this request.
    pub cookie_name: String,
}

impl Session {
    /// True when the request carries a valid cookie for `url_id` itself.
    pub fn is_owner(&self) -> bool {
        self.cookie_valid && !self.password.is_empty() && self.callee_id == self.url_id
    }
}

/// Result of a logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logout {
    pub cookie_name: String,
    /// A credential record was found and deleted.
    pub deleted: bool,
    /// `Set-Cookie` value that clears the client cookie.
    pub clear_cookie: String,
}

pub struct SessionResolver {
    store: Arc<dyn CredentialStore>,
    cookie_base: String,
    reserved_prefix: String,
    bucket: String,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn CredentialStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            cookie_base: config.cookie_name.clone(),
            reserved_prefix: config.reserved_prefix.clone(),
            bucket: config.credential_bucket.clone(),
        }
    }

    pub fn cookie_name_for(&self, url_id: &str) -> String {
        cookie::cookie_name(&self.cookie_base, &self.reserved_prefix, url_id)
    }

    pub fn resolve(&self, req: &RequestIdentity<'_>) -> Session {
        let referer = strip_query(req.referer.unwrap_or(""));
        let url_id = url_id(req.query_id, referer);
        let provisional = referer_callee_id(referer);
        let cookie_name = self.cookie_name_for(&url_id);

        let mut session = Session {
            callee_id: provisional.clone(),
            url_id,
            cookie_name,
            ..Session::default()
        };

        let Some(value) = req
            .cookie_header
            .and_then(|h| cookie::find_cookie(h, &session.cookie_name))
        else {
            tracing::debug!(
                cookie_name = %session.cookie_name,
                callee = %session.callee_id,
                url_id = %session.url_id,
                "no cookie"
            );
            return session;
        };

        let Some(parsed) = CookieValue::parse(value) else {
            tracing::warn!(cookie_name = %session.cookie_name, "cookie value has no separator, ignoring");
            return session;
        };

        if !provisional.is_empty() && provisional != parsed.callee_id {
            // Logging in under another id without clearing cookies lands here.
            tracing::info!(
                cookie_callee = parsed.callee_id,
                referer_callee = %provisional,
                "cookie belongs to another callee, ignoring"
            );
            return session;
        }
        if !parsed.callee_id.is_empty() {
            session.callee_id = parsed.callee_id.to_string();
        }

        match self.store.get(&self.bucket, value) {
            Err(StoreError::NotFound { .. }) => {
                tracing::info!(callee = %session.callee_id, "unknown cookie");
            }
            Err(e) => {
                tracing::warn!(error = %e, callee = %session.callee_id, "credential lookup failed");
            }
            Ok(PwIdCombo { callee_id, .. }) if callee_id != session.callee_id => {
                tracing::warn!(
                    stored = %callee_id,
                    callee = %session.callee_id,
                    "cookie stored for another callee, ignoring"
                );
            }
            Ok(PwIdCombo { pw, .. }) if pw.is_empty() => {
                tracing::warn!(callee = %session.callee_id, "cookie record has empty password, ignoring");
            }
            Ok(PwIdCombo { pw, .. }) => {
                session.password = pw;
                session.cookie_valid = true;
            }
        }
        session
    }

    /// Store a credential record and return the `Set-Cookie` value issuing it.
    pub fn issue(&self, callee_id: &str, hashed_password: &str) -> Result<String, StoreError> {
        let value = cookie::format_value(callee_id, hashed_password);
        self.store.put(
            &self.bucket,
            &value,
            PwIdCombo {
                callee_id: callee_id.to_string(),
                pw: hashed_password.to_string(),
            },
        )?;
        let name = self.cookie_name_for(callee_id);
        tracing::info!(callee = callee_id, cookie_name = %name, "session cookie issued");
        Ok(cookie::session_cookie(&name, &value))
    }

    /// Delete the record behind the presented cookie and clear the cookie.
    pub fn logout(&self, cookie_header: Option<&str>, url_id: &str) -> Logout {
        let cookie_name = self.cookie_name_for(url_id);
        let deleted = match cookie_header.and_then(|h| cookie::find_cookie(h, &cookie_name)) {
            Some(value) => match self.store.delete(&self.bucket, value) {
                Ok(()) => {
                    tracing::info!(cookie_name = %cookie_name, bucket = %self.bucket, "logout deleted credential record");
                    true
                }
                Err(e) => {
                    tracing::info!(error = %e, cookie_name = %cookie_name, "logout found no credential record");
                    false
                }
            },
            None => false,
        };
        tracing::info!(cookie_name = %cookie_name, "clear cookie");
        Logout {
            clear_cookie: cookie::clearing_cookie(&cookie_name),
            cookie_name,
            deleted,
        }
    }
}

// ── Referer parsing ───────────────────────────────────────────────────────────

/// Drop a `?query` suffix.
pub fn strip_query(referer: &str) -> &str {
    referer.split_once('?').map_or(referer, |(path, _)| path)
}

/// Text after the first `segment` in `referer`, unless the referer ends in
/// `/`.
fn after_segment<'a>(referer: &'a str, segment: &str) -> Option<&'a str> {
    if referer.ends_with('/') {
        return None;
    }
    referer
        .find(segment)
        .map(|idx| &referer[idx + segment.len()..])
}

/// Callee id named by a `/callee/<id>` referer, lower-cased. Empty if none.
pub fn referer_callee_id(referer: &str) -> String {
    after_segment(referer, CALLEE_SEGMENT)
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// urlID from `?id=` (lower-cased) or a `/user/` / `/button/` referer
/// (verbatim).
pub fn url_id(query_id: Option<&str>, referer: &str) -> String {
    if let Some(id) = query_id.filter(|id| !id.is_empty()) {
        return id.to_lowercase();
    }
    after_segment(referer, USER_SEGMENT)
        .or_else(|| after_segment(referer, BUTTON_SEGMENT))
        .unwrap_or_default()
        .to_string()
}
