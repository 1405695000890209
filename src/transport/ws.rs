/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use crate::activity::{Activity, StopToken};
use crate::lines::LineAssembler;
use crate::transport::blocking::BlockingSection;
use crate::transport::connect::{self, BoxedStream, Endpoint, TaskIo};
use crate::transport::listener::WsListener;
use crate::transport::options::TransportOptions;
use crate::utils::{IllegalArgumentException, TransportError};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use url::Url;

const THREAD_NAME: &str = "ls-ws-client";

/// Frames queued by `send()` and written by the transport thread.
type Outbound = Arc<Mutex<VecDeque<String>>>;

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value)
        .map_err(|e| TransportError::Protocol(format!("invalid header value {:?}: {}", value, e)))
}

/// Everything the transport thread needs to run one WebSocket session.
struct WsSession {
    url: Url,
    sub_protocol: String,
    options: TransportOptions,
}

impl WsSession {
    /// Builds the handshake request: sub-protocol, cookies, then caller headers.
    fn handshake_request(&self) -> Result<Request, TransportError> {
        let mut request = self.url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, header_value(&self.sub_protocol)?);
        if let Some(cookies) = self.options.cookie_jar.cookie_header_for_url(&self.url) {
            headers.insert(COOKIE, header_value(&cookies)?);
        }
        for (name, value) in &self.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Protocol(format!("invalid header name {:?}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }
        Ok(request)
    }

    async fn flush_outbound(
        ws: &mut WebSocketStream<BoxedStream>,
        frames: Vec<String>,
    ) -> Result<(), TransportError> {
        for frame in frames {
            trace!("Sending frame: {}", frame);
            ws.feed(Message::text(frame)).await?;
        }
        ws.flush().await?;
        Ok(())
    }

    fn run(
        &self,
        io: &TaskIo,
        stop: &StopToken,
        listener: &Mutex<Box<dyn WsListener>>,
        outbound: &Outbound,
    ) -> Result<(), TransportError> {
        let endpoint = Endpoint::from_url(&self.url)?;
        let request = self.handshake_request()?;

        let stream = io.block_on(connect::connect_stream(&endpoint, self.options.proxy.as_ref(), true))?;
        let (mut ws, response) = io.block_on(async {
            Ok::<_, TransportError>(tokio_tungstenite::client_async_with_config(request, stream, None).await?)
        })?;
        info!("WebSocket open on {} ({})", self.url, response.status());

        let cookies = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok());
        self.options.cookie_jar.set_cookies_from_headers(&self.url, cookies);

        listener.lock().on_open();

        let result = self.receive_loop(io, stop, listener, outbound, &mut ws);
        // Closing handshake on a best-effort basis; the socket is dropped either way.
        let _ = io.block_on(async {
            let _ = ws.close(None).await;
            Ok::<_, TransportError>(())
        });
        result
    }

    fn receive_loop(
        &self,
        io: &TaskIo,
        stop: &StopToken,
        listener: &Mutex<Box<dyn WsListener>>,
        outbound: &Outbound,
        ws: &mut WebSocketStream<BoxedStream>,
    ) -> Result<(), TransportError> {
        let timeout = self.options.receive_timeout;
        let mut assembler = LineAssembler::new();

        while !stop.is_stopped() {
            let received = io.block_on(async {
                Ok::<_, TransportError>(tokio::time::timeout(timeout, ws.next()).await.ok())
            })?;
            match received {
                None => {
                    let frames: Vec<String> = outbound.lock().drain(..).collect();
                    if !frames.is_empty() {
                        io.block_on(Self::flush_outbound(ws, frames))?;
                    }
                }
                Some(None) | Some(Some(Ok(Message::Close(_)))) => {
                    debug!("WebSocket closed by peer");
                    break;
                }
                Some(Some(Ok(Message::Text(text)))) => {
                    if text.is_empty() {
                        continue;
                    }
                    let mut listener = listener.lock();
                    assembler.read_bytes(text.as_str().as_bytes(), |line| listener.on_text(line));
                }
                Some(Some(Ok(_))) => {}
                Some(Some(Err(e))) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// WebSocket transport delivering CRLF terminated lines.
///
/// `connect()` opens the socket on a dedicated thread which owns it for both directions:
/// `send()` only queues text frames, the thread writes them whenever a receive attempt
/// times out. The listener gets `on_open`, then one `on_text` per reassembled line, and
/// `on_error` if the session fails. A stopped or disposed client closes silently.
pub struct WsClient {
    activity: Activity,
    session: Arc<WsSession>,
    listener: Arc<Mutex<Box<dyn WsListener>>>,
    outbound: Outbound,
    abort: CancellationToken,
}

impl WsClient {
    /// Creates a client for `url` (`ws`, `wss`, `http` or `https`; the latter two are
    /// mapped to their WebSocket counterparts) requesting the given sub-protocol.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgumentException` if the URL is invalid or the options are.
    pub fn new(
        url: &str,
        sub_protocol: impl Into<String>,
        options: TransportOptions,
        listener: Box<dyn WsListener>,
    ) -> Result<Self, IllegalArgumentException> {
        let mut url = Url::parse(url)
            .map_err(|e| IllegalArgumentException::new(&format!("Invalid URL {}: {}", url, e)))?;
        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(IllegalArgumentException::new(&format!(
                    "Unsupported WebSocket scheme: {}",
                    other
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| IllegalArgumentException::new("Cannot convert URL to a WebSocket URL"))?;
        Endpoint::from_url(&url).map_err(|e| IllegalArgumentException::new(&e.to_string()))?;
        options.validate()?;

        Ok(Self {
            activity: Activity::new(),
            session: Arc::new(WsSession {
                url,
                sub_protocol: sub_protocol.into(),
                options,
            }),
            listener: Arc::new(Mutex::new(listener)),
            outbound: Arc::new(Mutex::new(VecDeque::new())),
            abort: CancellationToken::new(),
        })
    }

    /// Opens the WebSocket on the transport thread.
    ///
    /// Does nothing if the client is already running or has been disposed. Handshake and
    /// network errors are reported through `on_error`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Spawn` if the thread cannot be created.
    pub fn connect(&self) -> Result<(), TransportError> {
        let session = Arc::clone(&self.session);
        let listener = Arc::clone(&self.listener);
        let outbound = Arc::clone(&self.outbound);
        let abort = self.abort.clone();

        let launched = self.activity.start(THREAD_NAME, move |stop| {
            let result = TaskIo::new(session.options.hooks.clone(), abort)
                .and_then(|io| session.run(&io, &stop, &listener, &outbound));
            match result {
                Ok(()) => debug!("WebSocket session on {} ended", session.url),
                Err(e) if e.is_aborted() => debug!("WebSocket session on {} aborted", session.url),
                Err(e) => {
                    error!("WebSocket session on {} failed: {}", session.url, e);
                    listener.lock().on_error(&e.to_string());
                }
            }
        })?;
        if launched {
            info!("WebSocket client connecting to {}", self.session.url);
        }
        Ok(())
    }

    /// Queues a text frame. Never blocks; the frame is written by the transport thread at
    /// its next receive timeout. Ignored once the client is disposed.
    pub fn send(&self, text: impl Into<String>) {
        if self.is_disposed() {
            return;
        }
        self.outbound.lock().push_back(text.into());
    }

    /// Requests a cooperative stop, observed within one receive timeout.
    pub fn stop(&self) {
        self.activity.stop();
    }

    /// Blocks until the transport thread has finished.
    pub fn wait(&self) {
        let _section = BlockingSection::enter(&self.session.options.hooks);
        self.activity.wait();
    }

    /// Aborts the socket, stops the client and waits for its thread. Idempotent.
    pub fn dispose(&self) {
        if !self.activity.dispose() {
            return;
        }
        debug!("Disposing WebSocket client for {}", self.session.url);
        self.abort.cancel();
        self.activity.stop();
        self.wait();
        self.outbound.lock().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.activity.is_disposed()
    }

    pub fn is_running(&self) -> bool {
        self.activity.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.activity.is_stopped()
    }

    /// The WebSocket URL (`ws` or `wss`).
    pub fn url(&self) -> &Url {
        &self.session.url
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for WsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsClient")
            .field("url", &self.session.url.as_str())
            .field("sub_protocol", &self.session.sub_protocol)
            .field("running", &self.is_running())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
