//! # Lightstreamer Transport
//!
//! This project is the network transport layer of a Lightstreamer TLCP (Text-based Live Connections Protocol) client written in Rust. It provides the building blocks a session engine needs to talk to a Lightstreamer server: a single-shot HTTP POST transport streaming its response line by line, a full-duplex WebSocket transport, a process-wide cookie store and an incremental CRLF line reassembler.
//!
//! ## About the transport layer
//!
//! TLCP is a line oriented protocol: every server notification is a text line terminated by CRLF. The transports in this crate take care of everything below that level:
//! - Opening plain or TLS connections, directly or through an HTTP proxy
//! - Sending requests and WebSocket frames with the right headers and cookies
//! - Reassembling lines that are split across network reads or WebSocket frames
//! - Keeping cookies (load balancer stickiness, authentication) across connections
//! - Running each connection on its own thread with a cooperative stop and a forced abort
//!
//! ## Features
//!
//! - **Lifecycle Management**:
//!   - `Activity`: start / stop / wait lifecycle over a dedicated, named thread
//!   - Cooperative stop flag checked at I/O loop granularity
//!   - Completion signalled even when the task body panics
//!
//! - **Transports**:
//!   - `HttpClient`: `application/x-www-form-urlencoded` POST, body streamed line by line
//!   - `WsClient`: WebSocket with sub-protocol negotiation and a non blocking `send()`
//!   - `Content-Length`, chunked and read-until-close response bodies
//!   - HTTP proxy support (absolute-form requests and `CONNECT` tunnels)
//!   - Replaceable process-wide TLS connector
//!   - Blocking region hooks for embedding runtimes
//!
//! - **Cookies**:
//!   - Domain, path, secure and expiry matching in the spirit of RFC 6265
//!   - Replacement by `(name, domain, path)` identity and deletion through `Max-Age=0`
//!   - Thread-safe store shared by every transport
//!
//! - **Event Handling**:
//!   - `HttpListener` and `WsListener` callback traits
//!   - Channel based listeners forwarding `TransportEvent`s to a Tokio receiver
//!
//! ## Installation
//!
//! To use this crate in your Rust project, add the following dependency to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! lightstreamer-transport = "0.1.0"
//! ```
//!
//! ## Usage
//!
//! Streaming the response of a session creation request:
//!
//! ```no_run
//! use lightstreamer_transport::transport::{HttpClient, HttpListener, TransportOptions};
//! use lightstreamer_transport::utils::encode_form;
//!
//! struct Printer;
//!
//! impl HttpListener for Printer {
//!     fn on_text(&mut self, line: &str) {
//!         println!("<< {}", line);
//!     }
//!
//!     fn on_error(&mut self, message: &str) {
//!         eprintln!("request failed: {}", message);
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let body = encode_form(&[("LS_cid", "mgQkwtwdysogQz2BJ4Ji kOj2Bg"), ("LS_adapter_set", "DEMO")])?;
//!     let client = HttpClient::new(
//!         "https://push.lightstreamer.com/lightstreamer/create_session.txt?LS_protocol=TLCP-2.5.0",
//!         body,
//!         TransportOptions::new(),
//!         Box::new(Printer),
//!     )?;
//!     client.start()?;
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     client.dispose();
//!     Ok(())
//! }
//! ```
//!
//! ### Using a WebSocket
//!
//! ```no_run
//! use lightstreamer_transport::transport::{ChannelWsListener, TransportEvent, TransportOptions, WsClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (listener, mut rx) = ChannelWsListener::create_channel();
//! let client = WsClient::new(
//!     "wss://push.lightstreamer.com/lightstreamer",
//!     "TLCP-2.5.0.lightstreamer.com",
//!     TransportOptions::new(),
//!     Box::new(listener),
//! )?;
//! client.connect()?;
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         TransportEvent::Open => client.send("wsok"),
//!         TransportEvent::Text(line) => println!("<< {}", line),
//!         TransportEvent::Error(message) => {
//!             eprintln!("session failed: {}", message);
//!             break;
//!         }
//!         TransportEvent::Done => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!

/// Module containing the start / stop / wait lifecycle of background tasks.
///
/// This module provides the `Activity` type every transport is built on, together with the
/// `StopToken` handed to the task body.
pub mod activity;

/// Module containing cookie handling.
///
/// This module provides the `HttpCookie` type and the thread-safe `CookieJar` that selects
/// which cookies apply to a URL.
pub mod cookies;

/// Module containing incremental line reassembly.
///
/// This module provides the `LineAssembler`, which turns arbitrarily fragmented byte
/// chunks into CRLF terminated lines.
pub mod lines;

/// Module containing process-wide network state.
///
/// This module provides the shared cookie jar and the replaceable TLS connector.
pub mod network;

/// Module containing the HTTP and WebSocket transports.
///
/// This module provides `HttpClient`, `WsClient`, their listener traits, options and
/// blocking hooks.
pub mod transport;

/// Module containing utility functions and error types.
///
/// This module provides common utilities and error types used throughout the library,
/// including exception types for handling illegal arguments, proxy configuration and logging
/// setup.
pub mod utils;
