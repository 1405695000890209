/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use std::error::Error;
use std::fmt;
use std::io;

/// Thrown to indicate that a method has been passed an illegal or inappropriate argument,
/// typically while configuring a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalArgumentException(String);

impl IllegalArgumentException {
    /// Creates a new exception carrying the given description.
    pub fn new(msg: &str) -> IllegalArgumentException {
        IllegalArgumentException(msg.to_string())
    }
}

impl fmt::Display for IllegalArgumentException {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for IllegalArgumentException {}

/// Errors raised while a transport task performs its network I/O.
///
/// These never cross the task boundary: the transport reports them once through the
/// listener's `on_error` hook, using the `Display` text as message.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The target URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL scheme is not one of http, https, ws or wss
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// The URL has no host component
    #[error("URL has no host: {0}")]
    MissingHost(String),
    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// TLS configuration or handshake failure
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
    /// WebSocket handshake or framing failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The peer sent something that is not valid HTTP
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The proxy refused or could not establish the tunnel
    #[error("proxy error: {0}")]
    Proxy(String),
    /// The connection was torn down by `dispose()`
    #[error("connection aborted")]
    Aborted,
    /// The background thread or its runtime could not be created
    #[error("cannot launch transport task: {0}")]
    Spawn(String),
}

impl TransportError {
    /// Returns true when the error is the consequence of a forced abort rather than a
    /// network failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }
}
