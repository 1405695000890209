/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! HTTP and WebSocket transports.
//!
//! Each transport runs on its own thread, built on [`Activity`](crate::activity::Activity).
//! Every blocking network call on that thread is bracketed by the [`BlockingHooks`] and can
//! be aborted by `dispose()`. Received data is delivered line by line to a listener.

mod blocking;
mod connect;
mod http;
mod listener;
mod options;
mod ws;

pub use blocking::{BlockingHooks, BlockingSection, NoopHooks};
pub use http::HttpClient;
pub use listener::{ChannelHttpListener, ChannelWsListener, HttpListener, TransportEvent, WsListener};
pub use options::{DEFAULT_RECEIVE_TIMEOUT, TransportOptions};
pub use ws::WsClient;
