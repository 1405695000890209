/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use cookie::Cookie;
use cookie::time::OffsetDateTime;
use std::fmt;

/// A cookie as exchanged through `Cookie` / `Set-Cookie` headers.
///
/// Unlike `cookie::Cookie`, the domain is kept verbatim (including a leading dot), since
/// the jar's matching rules depend on it.
///
/// `max_age` follows the classic convention: a negative value (the default) marks a session
/// cookie, zero means "expire immediately" and a positive value is a lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    max_age: i64,
}

impl HttpCookie {
    /// Creates a session cookie with no domain and no path.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: String::new(),
            secure: false,
            http_only: false,
            max_age: -1,
        }
    }

    /// Parses the value of a `Set-Cookie` header.
    ///
    /// When the header carries `Expires` but no `Max-Age`, the max age is computed from the
    /// expiration date (an expiration in the past yields 0). Returns `None` when the header
    /// is not a valid cookie.
    pub fn parse(header: &str) -> Option<HttpCookie> {
        let parsed = Cookie::parse(header.to_string()).ok()?;
        let mut cookie = HttpCookie::new(parsed.name(), parsed.value());
        if let Some(domain) = raw_attribute(header, "domain") {
            cookie.domain = domain;
        }
        if let Some(path) = parsed.path() {
            cookie.path = path.to_string();
        }
        cookie.secure = parsed.secure().unwrap_or(false);
        cookie.http_only = parsed.http_only().unwrap_or(false);
        if let Some(max_age) = parsed.max_age() {
            cookie.max_age = max_age.whole_seconds().max(0);
        } else if let Some(expires) = parsed.expires_datetime() {
            let remaining = expires - OffsetDateTime::now_utc();
            cookie.max_age = remaining.whole_seconds().max(0);
        }
        Some(cookie)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn set_http_only(&mut self, http_only: bool) {
        self.http_only = http_only;
    }

    /// Sets the lifetime in seconds; negative makes it a session cookie.
    pub fn set_max_age(&mut self, max_age: i64) {
        self.max_age = max_age;
    }

    /// Returns true if the cookie lives only as long as the session.
    pub fn is_session_cookie(&self) -> bool {
        self.max_age < 0
    }

    /// Returns true if both cookies have the same `(name, domain, path)` identity.
    pub fn has_same_identifier(&self, other: &HttpCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// The `name=value` pair sent back in a `Cookie` request header.
    pub fn to_request_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl fmt::Display for HttpCookie {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if !self.domain.is_empty() {
            write!(f, "; domain={}", self.domain)?;
        }
        if !self.path.is_empty() {
            write!(f, "; path={}", self.path)?;
        }
        if self.max_age >= 0 {
            write!(f, "; max-age={}", self.max_age)?;
        }
        if self.secure {
            write!(f, "; secure")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

/// Reads an attribute value straight from the header text, without the normalization
/// `cookie::Cookie` applies (it strips the leading dot of `Domain`).
fn raw_attribute(header: &str, attribute: &str) -> Option<String> {
    header.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(attribute) {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}
