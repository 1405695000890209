/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use crate::utils::IllegalArgumentException;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of proxy a transport should connect through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyType {
    /// HTTP proxy: plain requests in absolute-form, everything else through `CONNECT`.
    Http,
    /// SOCKS4 proxy. Accepted in configuration, not supported for connections.
    Socks4,
    /// SOCKS5 proxy. Accepted in configuration, not supported for connections.
    Socks5,
}

impl FromStr for ProxyType {
    type Err = IllegalArgumentException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HTTP" => Ok(ProxyType::Http),
            "SOCKS4" => Ok(ProxyType::Socks4),
            "SOCKS5" => Ok(ProxyType::Socks5),
            _ => Err(IllegalArgumentException::new(
                "Proxy type must be one of HTTP, SOCKS4 or SOCKS5",
            )),
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "HTTP"),
            ProxyType::Socks4 => write!(f, "SOCKS4"),
            ProxyType::Socks5 => write!(f, "SOCKS5"),
        }
    }
}

/// Simple class representing a Proxy configuration.
///
/// An instance of this class can be used through `TransportOptions::proxy()` to instruct
/// a transport to connect to the server through a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(rename = "type")]
    proxy_type: ProxyType,
    host: String,
    port: u16,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl Proxy {
    /// Creates a `Proxy` instance containing all the information required by the transports
    /// to connect to a server through it.
    ///
    /// # Parameters
    ///
    /// - `proxy_type`: the proxy type
    /// - `host`: the proxy host
    /// - `port`: the proxy port
    /// - `user`: the user name to be used to validate against the proxy. Optional.
    /// - `password`: the password to be used to validate against the proxy. Optional.
    pub fn new(
        proxy_type: ProxyType,
        host: String,
        port: u16,
        user: Option<String>,
        password: Option<String>,
    ) -> Proxy {
        Proxy {
            proxy_type,
            host,
            port,
            user,
            password,
        }
    }

    /// Returns the proxy type.
    pub fn get_proxy_type(&self) -> ProxyType {
        self.proxy_type
    }

    /// Returns the proxy host.
    pub fn get_host(&self) -> &str {
        &self.host
    }

    /// Returns the proxy port.
    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Returns the user name, if any.
    pub fn get_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// `host:port` of the proxy, as used to open the socket.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Value of the `Proxy-Authorization` header, when a user is configured.
    pub fn authorization(&self) -> Option<String> {
        let user = self.user.as_deref()?;
        let password = self.password.as_deref().unwrap_or("");
        let credentials = STANDARD.encode(format!("{}:{}", user, password));
        Some(format!("Basic {}", credentials))
    }

    /// Checks that the configuration can be used to open a connection.
    pub fn validate(&self) -> Result<(), IllegalArgumentException> {
        if self.host.trim().is_empty() {
            return Err(IllegalArgumentException::new("Proxy host cannot be empty"));
        }
        if self.port == 0 {
            return Err(IllegalArgumentException::new(
                "Proxy port must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_type_from_str() {
        assert_eq!("http".parse::<ProxyType>().unwrap(), ProxyType::Http);
        assert_eq!("SOCKS5".parse::<ProxyType>().unwrap(), ProxyType::Socks5);
        assert!("ftp".parse::<ProxyType>().is_err());
    }

    #[test]
    fn test_authorization_header() {
        let proxy = Proxy::new(
            ProxyType::Http,
            "proxy.local".to_string(),
            3128,
            Some("Aladdin".to_string()),
            Some("open sesame".to_string()),
        );
        assert_eq!(
            proxy.authorization().as_deref(),
            Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
        );
        assert_eq!(proxy.authority(), "proxy.local:3128");
    }

    #[test]
    fn test_no_authorization_without_user() {
        let proxy = Proxy::new(ProxyType::Http, "proxy.local".to_string(), 3128, None, None);
        assert!(proxy.authorization().is_none());
    }

    #[test]
    fn test_validate() {
        let proxy = Proxy::new(ProxyType::Http, "".to_string(), 3128, None, None);
        assert!(proxy.validate().is_err());
        let proxy = Proxy::new(ProxyType::Http, "proxy".to_string(), 0, None, None);
        assert!(proxy.validate().is_err());
        let proxy = Proxy::new(ProxyType::Http, "proxy".to_string(), 8080, None, None);
        assert!(proxy.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{"type":"HTTP","host":"proxy.local","port":8080,"user":"u"}"#;
        let proxy: Proxy = serde_json::from_str(json).unwrap();
        assert_eq!(proxy.get_proxy_type(), ProxyType::Http);
        assert_eq!(proxy.get_port(), 8080);
        assert_eq!(proxy.get_user(), Some("u"));
        assert_eq!(proxy.authorization().as_deref(), Some("Basic dTo="));
    }
}
