/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use crate::activity::{Activity, StopToken};
use crate::cookies::CookieJar;
use crate::transport::blocking::BlockingSection;
use crate::transport::connect::{self, Endpoint, ResponseHead, TaskIo};
use crate::transport::listener::HttpListener;
use crate::transport::options::TransportOptions;
use crate::utils::{IllegalArgumentException, Proxy, TransportError, set_header};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::{Position, Url};

const THREAD_NAME: &str = "ls-http-client";
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// How the end of a response body is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// `Transfer-Encoding: chunked`; `remaining` bytes are left in the current chunk.
    Chunked { remaining: u64, started: bool, finished: bool },
    /// `Content-Length`; `remaining` bytes are left.
    Length { remaining: u64 },
    /// The body ends when the server closes the connection.
    UntilClose,
}

impl Framing {
    fn from_head(head: &ResponseHead) -> Result<Self, TransportError> {
        // 1xx, 204 and 304 responses never carry a body.
        if head.is_informational() || head.status == 204 || head.status == 304 {
            return Ok(Framing::Length { remaining: 0 });
        }
        let chunked = head
            .header("Transfer-Encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
        if chunked {
            return Ok(Framing::Chunked {
                remaining: 0,
                started: false,
                finished: false,
            });
        }
        match head.header("Content-Length") {
            Some(len) => {
                let remaining = len.trim().parse::<u64>().map_err(|_| {
                    TransportError::Protocol(format!("invalid Content-Length: {}", len))
                })?;
                Ok(Framing::Length { remaining })
            }
            None => Ok(Framing::UntilClose),
        }
    }
}

/// Decodes the response body according to its framing.
struct BodyReader<R> {
    reader: R,
    framing: Framing,
}

impl<R: AsyncBufRead + Unpin> BodyReader<R> {
    fn new(reader: R, framing: Framing) -> Self {
        Self { reader, framing }
    }

    async fn read_chunk_size(&mut self) -> Result<u64, TransportError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(TransportError::Protocol(
                "unexpected end of chunked body".to_string(),
            ));
        }
        let size = line.trim().split(';').next().unwrap_or_default().trim();
        u64::from_str_radix(size, 16)
            .map_err(|_| TransportError::Protocol(format!("invalid chunk size: {}", size)))
    }

    async fn skip_line(&mut self) -> Result<usize, TransportError> {
        let mut line = Vec::new();
        Ok(self.reader.read_until(b'\n', &mut line).await?)
    }

    /// Reads body bytes into `buf`. Returns 0 at the end of the body.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.framing {
            Framing::UntilClose => Ok(self.reader.read(buf).await?),
            Framing::Length { remaining } => {
                if remaining == 0 {
                    return Ok(0);
                }
                let limit = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                let n = self.reader.read(&mut buf[..limit]).await?;
                // A body shorter than announced is treated as complete.
                let remaining = if n == 0 { 0 } else { remaining - n as u64 };
                self.framing = Framing::Length { remaining };
                Ok(n)
            }
            Framing::Chunked {
                mut remaining,
                started,
                finished,
            } => {
                if finished {
                    return Ok(0);
                }
                if remaining == 0 {
                    if started {
                        // CRLF closing the previous chunk
                        self.skip_line().await?;
                    }
                    remaining = self.read_chunk_size().await?;
                    if remaining == 0 {
                        // trailers, up to the empty line
                        let mut line = String::new();
                        loop {
                            line.clear();
                            let n = self.reader.read_line(&mut line).await?;
                            if n == 0 || line.trim().is_empty() {
                                break;
                            }
                        }
                        self.framing = Framing::Chunked {
                            remaining: 0,
                            started: true,
                            finished: true,
                        };
                        return Ok(0);
                    }
                }
                let limit = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                let n = self.reader.read(&mut buf[..limit]).await?;
                if n == 0 {
                    return Err(TransportError::Protocol(
                        "unexpected end of chunked body".to_string(),
                    ));
                }
                self.framing = Framing::Chunked {
                    remaining: remaining - n as u64,
                    started: true,
                    finished: false,
                };
                Ok(n)
            }
        }
    }
}

/// Splits a byte stream on LF, dropping a CR right before it.
#[derive(Debug, Default)]
struct LfLines {
    pending: Vec<u8>,
}

impl LfLines {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// The unterminated remainder, if any, once the stream has ended.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Everything the transport thread needs to perform one request.
struct HttpRequest {
    url: Url,
    body: String,
    options: TransportOptions,
}

impl HttpRequest {
    /// Serializes the POST request, cookies from `jar` included.
    fn encode(&self, endpoint: &Endpoint, jar: &CookieJar, proxy: Option<&Proxy>) -> Vec<u8> {
        let absolute_form = proxy.is_some() && !endpoint.secure;
        let target = if absolute_form {
            &self.url[..Position::AfterQuery]
        } else {
            &self.url[Position::BeforePath..Position::AfterQuery]
        };

        let mut headers: Vec<(String, String)> = vec![("Host".to_string(), endpoint.host_header())];
        if absolute_form {
            if let Some(credentials) = proxy.and_then(Proxy::authorization) {
                headers.push(("Proxy-Authorization".to_string(), credentials));
            }
        }
        if let Some(cookies) = jar.cookie_header_for_url(&self.url) {
            headers.push(("Cookie".to_string(), cookies));
        }
        for (name, value) in &self.options.headers {
            set_header(&mut headers, name, value);
        }
        set_header(
            &mut headers,
            "Content-Type",
            "application/x-www-form-urlencoded",
        );
        set_header(&mut headers, "Content-Length", &self.body.len().to_string());

        let mut request = format!("POST {} HTTP/1.1\r\n", target);
        for (name, value) in &headers {
            request.push_str(name);
            request.push_str(": ");
            request.push_str(value);
            request.push_str("\r\n");
        }
        request.push_str("\r\n");
        let mut bytes = request.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }

    /// Performs the request and streams the body lines to the listener.
    fn run(
        &self,
        io: &TaskIo,
        stop: &StopToken,
        listener: &Mutex<Box<dyn HttpListener>>,
    ) -> Result<(), TransportError> {
        let endpoint = Endpoint::from_url(&self.url)?;
        let proxy = self.options.proxy.as_ref();
        let jar = &self.options.cookie_jar;

        let stream = io.block_on(connect::connect_stream(&endpoint, proxy, false))?;
        info!("Connected to {}", endpoint.authority());

        let mut reader = BufReader::new(stream);
        let request = self.encode(&endpoint, jar, proxy);
        io.block_on(async {
            reader.get_mut().write_all(&request).await?;
            reader.get_mut().flush().await?;
            Ok::<_, TransportError>(())
        })?;
        debug!("POST {} sent ({} body bytes)", self.url, self.body.len());

        let head = io.block_on(async {
            loop {
                let head = connect::read_response_head(&mut reader).await?;
                if !head.is_informational() {
                    return Ok::<_, TransportError>(head);
                }
            }
        })?;
        if head.is_success() {
            debug!("Response {} {}", head.status, head.reason);
        } else {
            warn!("Response {} {} from {}", head.status, head.reason, self.url);
        }
        jar.set_cookies_from_headers(&self.url, head.header_values("Set-Cookie"));

        let mut body = BodyReader::new(reader, Framing::from_head(&head)?);
        let mut lines = LfLines::default();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            if stop.is_stopped() {
                return Ok(());
            }
            let n = io.block_on(body.read(&mut buf))?;
            if n == 0 {
                break;
            }
            lines.push(&buf[..n]);
            while let Some(line) = lines.next_line() {
                if stop.is_stopped() {
                    return Ok(());
                }
                listener.lock().on_text(&line);
            }
        }
        if let Some(line) = lines.finish() {
            if !stop.is_stopped() {
                listener.lock().on_text(&line);
            }
        }
        Ok(())
    }
}

/// Single-shot HTTP POST transport streaming the response body line by line.
///
/// `start()` launches the request on a dedicated thread; the listener receives one
/// `on_text` per body line and then exactly one of `on_done` / `on_error`. `dispose()`
/// aborts the connection wherever it is blocked and waits for the thread to exit.
pub struct HttpClient {
    activity: Activity,
    request: Arc<HttpRequest>,
    listener: Arc<Mutex<Box<dyn HttpListener>>>,
    abort: CancellationToken,
}

impl HttpClient {
    /// Creates a client that will POST `body` (already form-encoded) to `url`.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgumentException` if `url` is not an absolute http(s) URL or the
    /// options are invalid.
    pub fn new(
        url: &str,
        body: impl Into<String>,
        options: TransportOptions,
        listener: Box<dyn HttpListener>,
    ) -> Result<Self, IllegalArgumentException> {
        let url = Url::parse(url)
            .map_err(|e| IllegalArgumentException::new(&format!("Invalid URL {}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IllegalArgumentException::new(
                "HTTP transport requires an http or https URL",
            ));
        }
        Endpoint::from_url(&url).map_err(|e| IllegalArgumentException::new(&e.to_string()))?;
        options.validate()?;

        Ok(Self {
            activity: Activity::new(),
            request: Arc::new(HttpRequest {
                url,
                body: body.into(),
                options,
            }),
            listener: Arc::new(Mutex::new(listener)),
            abort: CancellationToken::new(),
        })
    }

    /// Launches the request on the transport thread.
    ///
    /// Does nothing if the client is already running or has been disposed. Network errors
    /// are never returned here, they are reported through `on_error`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Spawn` if the thread cannot be created.
    pub fn start(&self) -> Result<(), TransportError> {
        let request = Arc::clone(&self.request);
        let listener = Arc::clone(&self.listener);
        let abort = self.abort.clone();

        let launched = self.activity.start(THREAD_NAME, move |stop| {
            let result = TaskIo::new(request.options.hooks.clone(), abort)
                .and_then(|io| request.run(&io, &stop, &listener));
            match result {
                Ok(()) => {
                    debug!("HTTP request to {} completed", request.url);
                    listener.lock().on_done();
                }
                Err(e) if e.is_aborted() => {
                    debug!("HTTP request to {} aborted", request.url);
                    listener.lock().on_done();
                }
                Err(e) => {
                    error!("HTTP request to {} failed: {}", request.url, e);
                    listener.lock().on_error(&e.to_string());
                }
            }
        })?;
        if launched {
            info!("HTTP client started for {}", self.request.url);
        }
        Ok(())
    }

    /// Requests a cooperative stop: the body is abandoned before the next line.
    pub fn stop(&self) {
        self.activity.stop();
    }

    /// Blocks until the transport thread has finished.
    pub fn wait(&self) {
        let _section = BlockingSection::enter(&self.request.options.hooks);
        self.activity.wait();
    }

    /// Aborts the connection, stops the client and waits for its thread. Idempotent.
    pub fn dispose(&self) {
        if !self.activity.dispose() {
            return;
        }
        debug!("Disposing HTTP client for {}", self.request.url);
        self.abort.cancel();
        self.activity.stop();
        self.wait();
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

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.request.url
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("url", &self.request.url.as_str())
            .field("running", &self.is_running())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::HttpCookie;
    use crate::utils::ProxyType;
    use std::io::Cursor;

    fn request(url: &str, body: &str, options: TransportOptions) -> HttpRequest {
        HttpRequest {
            url: Url::parse(url).unwrap(),
            body: body.to_string(),
            options,
        }
    }

    fn encode(req: &HttpRequest, proxy: Option<&Proxy>) -> String {
        let endpoint = Endpoint::from_url(&req.url).unwrap();
        String::from_utf8(req.encode(&endpoint, &req.options.cookie_jar, proxy)).unwrap()
    }

    #[test]
    fn test_encode_request() {
        let jar = Arc::new(CookieJar::new());
        let url = Url::parse("http://acme.com:8080/lightstreamer/create_session.txt").unwrap();
        jar.set_cookies_from_url(&url, &[HttpCookie::new("a", "1")]);
        let options = TransportOptions::new()
            .cookie_jar(jar)
            .header("X-Custom", "yes")
            .header("content-type", "text/plain");
        let req = request(
            "http://acme.com:8080/lightstreamer/create_session.txt?LS_protocol=TLCP-2.5.0",
            "LS_cid=x&LS_adapter_set=DEMO",
            options,
        );
        let raw = encode(&req, None);
        assert_eq!(
            raw,
            "POST /lightstreamer/create_session.txt?LS_protocol=TLCP-2.5.0 HTTP/1.1\r\n\
             Host: acme.com:8080\r\n\
             Cookie: a=1\r\n\
             X-Custom: yes\r\n\
             content-type: application/x-www-form-urlencoded\r\n\
             Content-Length: 28\r\n\
             \r\n\
             LS_cid=x&LS_adapter_set=DEMO"
        );
    }

    #[test]
    fn test_encode_request_through_proxy() {
        let options = TransportOptions::new().cookie_jar(Arc::new(CookieJar::new()));
        let req = request("http://acme.com/ls", "", options);
        let proxy = Proxy::new(
            ProxyType::Http,
            "proxy".to_string(),
            3128,
            Some("user".to_string()),
            Some("pass".to_string()),
        );
        let raw = encode(&req, Some(&proxy));
        assert!(raw.starts_with("POST http://acme.com/ls HTTP/1.1\r\nHost: acme.com\r\n"));
        assert!(raw.contains("Proxy-Authorization: Basic dXNlcjpwYXNz\r\n"));
        assert!(raw.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let options = TransportOptions::new().cookie_jar(Arc::new(CookieJar::new()));
        let req = request("https://acme.com/", "k=\u{e9}", options);
        assert!(encode(&req, None).contains("Content-Length: 4\r\n"));
    }

    #[test]
    fn test_lf_lines() {
        let mut lines = LfLines::default();
        lines.push(b"one\r\ntwo\nthr");
        assert_eq!(lines.next_line().as_deref(), Some("one"));
        assert_eq!(lines.next_line().as_deref(), Some("two"));
        assert_eq!(lines.next_line(), None);
        lines.push(b"ee\r");
        assert_eq!(lines.next_line(), None);
        lines.push(b"\n\nlast");
        assert_eq!(lines.next_line().as_deref(), Some("three"));
        assert_eq!(lines.next_line().as_deref(), Some(""));
        assert_eq!(lines.finish().as_deref(), Some("last"));
        assert_eq!(lines.finish(), None);
    }

    async fn read_all(raw: &[u8], framing: Framing) -> Result<Vec<u8>, TransportError> {
        let mut body = BodyReader::new(BufReader::new(Cursor::new(raw.to_vec())), framing);
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = body.read(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn test_chunked_body() {
        let raw = b"5\r\nhello\r\n7;ext=1\r\n world!\r\n0\r\nTrailer: x\r\n\r\nignored";
        let framing = Framing::Chunked {
            remaining: 0,
            started: false,
            finished: false,
        };
        assert_eq!(read_all(raw, framing).await.unwrap(), b"hello world!");
    }

    #[tokio::test]
    async fn test_truncated_chunked_body() {
        let framing = Framing::Chunked {
            remaining: 0,
            started: false,
            finished: false,
        };
        assert!(matches!(
            read_all(b"a\r\nshort", framing).await,
            Err(TransportError::Protocol(_))
        ));
        assert!(read_all(b"zz\r\n", framing).await.is_err());
    }

    #[tokio::test]
    async fn test_content_length_body() {
        let framing = Framing::Length { remaining: 5 };
        assert_eq!(read_all(b"hello, extra", framing).await.unwrap(), b"hello");
        // shorter than announced
        assert_eq!(read_all(b"hel", framing).await.unwrap(), b"hel");
    }

    #[tokio::test]
    async fn test_until_close_body() {
        assert_eq!(
            read_all(b"everything", Framing::UntilClose).await.unwrap(),
            b"everything"
        );
    }

    #[test]
    fn test_framing_from_head() {
        let head = |headers: &[(&str, &str)]| ResponseHead {
            status: 200,
            reason: "OK".to_string(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        };
        assert!(matches!(
            Framing::from_head(&head(&[("transfer-encoding", "Chunked")])).unwrap(),
            Framing::Chunked { .. }
        ));
        assert_eq!(
            Framing::from_head(&head(&[("Content-Length", "12")])).unwrap(),
            Framing::Length { remaining: 12 }
        );
        assert_eq!(Framing::from_head(&head(&[])).unwrap(), Framing::UntilClose);
        assert!(Framing::from_head(&head(&[("Content-Length", "x")])).is_err());
    }

    #[test]
    fn test_bodyless_statuses_have_empty_framing() {
        for status in [204, 304] {
            let head = ResponseHead {
                status,
                reason: String::new(),
                headers: vec![("Transfer-Encoding".to_string(), "chunked".to_string())],
            };
            assert_eq!(
                Framing::from_head(&head).unwrap(),
                Framing::Length { remaining: 0 }
            );
        }
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        let listener = || -> Box<dyn HttpListener> {
            Box::new(crate::transport::ChannelHttpListener::create_channel().0)
        };
        assert!(HttpClient::new("not a url", "", TransportOptions::new(), listener()).is_err());
        assert!(HttpClient::new("ws://acme.com/", "", TransportOptions::new(), listener()).is_err());
        assert!(HttpClient::new("http://acme.com/", "", TransportOptions::new(), listener()).is_ok());
    }

    #[test]
    fn test_dispose_before_start() {
        let (listener, _rx) = crate::transport::ChannelHttpListener::create_channel();
        let client =
            HttpClient::new("http://acme.com/", "", TransportOptions::new(), Box::new(listener)).unwrap();
        client.dispose();
        assert!(client.is_disposed());
        client.start().unwrap();
        assert!(!client.is_running());
        client.dispose();
    }
}
