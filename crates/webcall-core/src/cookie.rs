//! Session cookie naming, parsing and `Set-Cookie` rendering.
//!
//! Cookie value format: `<calleeID>&<hashedPassword>`. The cookie name is
//! the configured base name, or `<base>-<urlID>` when the urlID carries the
//! reserved prefix of the always-on account class, so that class can hold
//! several sessions side by side.

/// Separator between the callee id and the hashed password.
pub const VALUE_SEPARATOR: char = '&';

/// Past instant used to make the browser drop a cleared cookie.
const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Choose the cookie name for a request carrying `url_id`.
pub fn cookie_name(base: &str, reserved_prefix: &str, url_id: &str) -> String {
    if !url_id.is_empty() && !reserved_prefix.is_empty() && url_id.starts_with(reserved_prefix) {
        format!("{base}-{url_id}")
    } else {
        base.to_string()
    }
}

/// Find the value of cookie `name` in a `Cookie` request header.
/// The first occurrence wins; surrounding double quotes are stripped.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        if k.trim() != name {
            return None;
        }
        let v = v.trim();
        Some(
            v.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(v),
        )
    })
}

/// A cookie value split at its first separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieValue<'a> {
    /// Everything before the first `&`. May be empty.
    pub callee_id: &'a str,
    pub hashed_password: &'a str,
}

impl<'a> CookieValue<'a> {
    /// `None` if the value has no separator.
    pub fn parse(value: &'a str) -> Option<Self> {
        let (callee_id, hashed_password) = value.split_once(VALUE_SEPARATOR)?;
        Some(Self {
            callee_id,
            hashed_password,
        })
    }
}

/// Render the value for a session cookie.
pub fn format_value(callee_id: &str, hashed_password: &str) -> String {
    format!("{callee_id}{VALUE_SEPARATOR}{hashed_password}")
}

/// `Set-Cookie` header value for an issued session cookie.
///
/// Not `HttpOnly`: the web client reads it.
pub fn session_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; SameSite=Strict")
}

/// `Set-Cookie` header value that clears `name` on the client.
pub fn clearing_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Expires={EXPIRED}; SameSite=Strict")
}
