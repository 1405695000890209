/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Connection plumbing shared by both transports: the per-thread runtime, endpoint
//! resolution, proxy tunnelling, TLS and HTTP response heads.

use crate::network;
use crate::transport::blocking::{BlockingHooks, BlockingSection};
use crate::utils::{Proxy, ProxyType, TransportError};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// Upper bound on the size of an HTTP response head (status line plus headers).
const MAX_HEAD_SIZE: u64 = 64 * 1024;

pub(crate) trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// A plain or TLS connection.
pub(crate) type BoxedStream = Box<dyn AsyncStream>;

/// The I/O context of one transport thread.
///
/// Every blocking call goes through [`TaskIo::block_on`], which brackets it with the
/// blocking hooks and races it against the abort token cancelled by `dispose()`.
pub(crate) struct TaskIo {
    runtime: Runtime,
    hooks: Arc<dyn BlockingHooks>,
    abort: CancellationToken,
}

impl TaskIo {
    pub fn new(hooks: Arc<dyn BlockingHooks>, abort: CancellationToken) -> Result<Self, TransportError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;
        Ok(Self {
            runtime,
            hooks,
            abort,
        })
    }

    /// Runs `fut` to completion on this thread, or until the transport is aborted.
    pub fn block_on<F, T>(&self, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        if self.abort.is_cancelled() {
            return Err(TransportError::Aborted);
        }
        let _section = BlockingSection::enter(&self.hooks);
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = self.abort.cancelled() => Err(TransportError::Aborted),
                result = fut => result,
            }
        })
    }
}

/// Where a URL points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub secure: bool,
    /// Host as written in the URL (IPv6 literals keep their brackets).
    pub host: String,
    pub port: u16,
    pub default_port: bool,
}

impl Endpoint {
    pub fn from_url(url: &Url) -> Result<Self, TransportError> {
        let secure = match url.scheme() {
            "http" | "ws" => false,
            "https" | "wss" => true,
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::MissingHost(url.to_string()))?;
        let default = if secure { 443 } else { 80 };
        let port = url.port().unwrap_or(default);
        Ok(Self {
            secure,
            host: host.to_string(),
            port,
            default_port: port == default,
        })
    }

    /// Host without IPv6 brackets, as needed to open a socket or verify a certificate.
    pub fn bare_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// `host:port`, as used by `CONNECT`.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Value of the `Host` header: the port is omitted when it is the scheme default.
    pub fn host_header(&self) -> String {
        if self.default_port {
            self.host.clone()
        } else {
            self.authority()
        }
    }
}

/// Status line and headers of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        crate::utils::get_header(&self.headers, name)
    }

    /// All the values of a repeatable header, in order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

async fn read_head_line<R>(reader: &mut R, budget: &mut u64) -> Result<Option<String>, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = (&mut *reader).take(*budget).read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    *budget -= n as u64;
    if line.last() != Some(&b'\n') {
        if *budget == 0 {
            return Err(TransportError::Protocol("response head too large".to_string()));
        }
        return Err(TransportError::Protocol(
            "connection closed inside the response head".to_string(),
        ));
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

fn parse_status_line(line: &str) -> Result<(u16, String), TransportError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(TransportError::Protocol(format!("malformed status line: {}", line)));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| TransportError::Protocol(format!("malformed status line: {}", line)))?;
    let reason = parts.next().unwrap_or_default().trim().to_string();
    Ok((status, reason))
}

/// Reads one response head, leaving the reader positioned on the first body byte.
pub(crate) async fn read_response_head<R>(reader: &mut R) -> Result<ResponseHead, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_HEAD_SIZE;
    let status_line = read_head_line(reader, &mut budget).await?.ok_or_else(|| {
        TransportError::Protocol("connection closed before the response".to_string())
    })?;
    let (status, reason) = parse_status_line(&status_line)?;

    let mut headers = Vec::new();
    loop {
        let line = read_head_line(reader, &mut budget).await?.ok_or_else(|| {
            TransportError::Protocol("connection closed inside the response head".to_string())
        })?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| TransportError::Protocol(format!("malformed header line: {}", line)))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    trace!("Response head: {} {} ({} headers)", status, reason, headers.len());
    Ok(ResponseHead {
        status,
        reason,
        headers,
    })
}

/// Asks an HTTP proxy to open a tunnel to `endpoint`.
async fn open_tunnel(stream: &mut TcpStream, endpoint: &Endpoint, proxy: &Proxy) -> Result<(), TransportError> {
    let authority = endpoint.authority();
    let mut request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", authority, authority);
    if let Some(credentials) = proxy.authorization() {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", credentials));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let head = read_response_head(&mut reader).await?;
    if !head.is_success() {
        return Err(TransportError::Proxy(format!(
            "CONNECT {} refused: {} {}",
            authority, head.status, head.reason
        )));
    }
    if !reader.buffer().is_empty() {
        return Err(TransportError::Proxy(
            "unexpected data after the CONNECT response".to_string(),
        ));
    }
    debug!("Tunnel to {} opened through {}", authority, proxy.authority());
    Ok(())
}

/// Opens the TCP connection to `endpoint`, or to `proxy` when one is configured.
///
/// With a proxy, `tunnel` selects between a `CONNECT` tunnel to the endpoint and a plain
/// connection to the proxy itself (for absolute-form HTTP requests).
pub(crate) async fn connect_tcp(
    endpoint: &Endpoint,
    proxy: Option<&Proxy>,
    tunnel: bool,
) -> Result<TcpStream, TransportError> {
    let stream = match proxy {
        None => TcpStream::connect((endpoint.bare_host(), endpoint.port)).await?,
        Some(proxy) => {
            if proxy.get_proxy_type() != ProxyType::Http {
                return Err(TransportError::Proxy(format!(
                    "{} proxies are not supported",
                    proxy.get_proxy_type()
                )));
            }
            let mut stream = TcpStream::connect((proxy.get_host(), proxy.get_port())).await?;
            if tunnel {
                open_tunnel(&mut stream, endpoint, proxy).await?;
            }
            stream
        }
    };
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Opens the connection and, for secure endpoints, performs the TLS handshake with the
/// process-wide connector.
pub(crate) async fn connect_stream(
    endpoint: &Endpoint,
    proxy: Option<&Proxy>,
    tunnel: bool,
) -> Result<BoxedStream, TransportError> {
    let tcp = connect_tcp(endpoint, proxy, tunnel || endpoint.secure).await?;
    if !endpoint.secure {
        return Ok(Box::new(tcp));
    }
    let connector = tokio_native_tls::TlsConnector::from(network::tls_connector()?);
    let tls = connector.connect(endpoint.bare_host(), tcp).await?;
    debug!("TLS session established with {}", endpoint.host);
    Ok(Box::new(tls))
}
