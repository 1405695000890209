/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Process-wide state shared by every transport: the cookie jar and the TLS connector.
//!
//! Transports read the TLS connector once, while setting up a connection, so replacing it
//! only affects connections opened afterwards.

use crate::cookies::CookieJar;
use crate::utils::TransportError;
use native_tls::TlsConnector;
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};
use tracing::info;

static COOKIE_JAR: LazyLock<Arc<CookieJar>> = LazyLock::new(|| Arc::new(CookieJar::new()));

static TLS_CONNECTOR: LazyLock<RwLock<Option<TlsConnector>>> = LazyLock::new(|| RwLock::new(None));

/// Returns the cookie jar shared by all transports that were not given their own.
pub fn cookie_jar() -> Arc<CookieJar> {
    Arc::clone(&COOKIE_JAR)
}

/// Replaces the TLS connector used for `https` and `wss` connections.
///
/// # Examples
///
/// ```no_run
/// use lightstreamer_transport::network;
///
/// let connector = native_tls::TlsConnector::builder()
///     .danger_accept_invalid_certs(true)
///     .build()
///     .unwrap();
/// network::set_tls_connector(connector);
/// ```
pub fn set_tls_connector(connector: TlsConnector) {
    *TLS_CONNECTOR.write() = Some(connector);
    info!("TLS connector replaced");
}

/// Restores the default TLS connector (system trust store, certificate verification on).
pub fn clear_tls_connector() {
    *TLS_CONNECTOR.write() = None;
    info!("TLS connector reset to default");
}

/// The connector to use for the next TLS handshake.
pub(crate) fn tls_connector() -> Result<TlsConnector, TransportError> {
    if let Some(connector) = TLS_CONNECTOR.read().as_ref() {
        return Ok(connector.clone());
    }
    Ok(TlsConnector::new()?)
}
