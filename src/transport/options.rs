/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use crate::cookies::CookieJar;
use crate::network;
use crate::transport::blocking::{BlockingHooks, NoopHooks};
use crate::utils::{IllegalArgumentException, Proxy};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single WebSocket receive before the loop re-checks the stop flag
/// and drains queued sends.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(250);

/// Settings shared by [`HttpClient`](crate::transport::HttpClient) and
/// [`WsClient`](crate::transport::WsClient).
///
/// # Examples
///
/// ```
/// use lightstreamer_transport::transport::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new()
///     .header("X-Client", "demo")
///     .receive_timeout(Duration::from_millis(100));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct TransportOptions {
    /// Extra headers sent with every request or handshake.
    pub headers: BTreeMap<String, String>,
    /// Proxy to connect through, if any.
    pub proxy: Option<Proxy>,
    /// WebSocket receive timeout.
    pub receive_timeout: Duration,
    /// Blocking region notifications.
    pub hooks: Arc<dyn BlockingHooks>,
    /// Cookie store consulted and updated by the transport.
    pub cookie_jar: Arc<CookieJar>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            proxy: None,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            hooks: Arc::new(NoopHooks),
            cookie_jar: network::cookie_jar(),
        }
    }
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extra header, replacing a previous value with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replaces all extra headers.
    #[must_use]
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn BlockingHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Uses a private cookie jar instead of the process-wide one.
    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = jar;
        self
    }

    /// Checks the options before a transport is built from them.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgumentException` if the receive timeout is zero, a header name is
    /// empty, or the proxy is misconfigured.
    pub fn validate(&self) -> Result<(), IllegalArgumentException> {
        if self.receive_timeout.is_zero() {
            return Err(IllegalArgumentException::new(
                "Receive timeout must be greater than zero",
            ));
        }
        if self.headers.keys().any(|name| name.trim().is_empty()) {
            return Err(IllegalArgumentException::new("Header names cannot be empty"));
        }
        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }
        Ok(())
    }
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("headers", &self.headers)
            .field("proxy", &self.proxy)
            .field("receive_timeout", &self.receive_timeout)
            .field("cookies", &self.cookie_jar.len())
            .finish_non_exhaustive()
    }
}
