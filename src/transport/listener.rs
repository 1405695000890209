/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use tokio::sync::mpsc;

/// Interface to be implemented to receive the output of an [`HttpClient`](crate::transport::HttpClient).
///
/// All methods are called on the transport thread. For a given run, zero or more
/// `on_text` calls are followed by exactly one of `on_done` or `on_error`.
pub trait HttpListener: Send {
    /// Event handler called once per line of the response body, in arrival order,
    /// without the line terminator.
    fn on_text(&mut self, _line: &str) {
        // Default implementation does nothing.
    }

    /// Event handler called once when the request could not be completed. Terminal.
    fn on_error(&mut self, _message: &str) {
        // Default implementation does nothing.
    }

    /// Event handler called once when the response body ended or the client was stopped.
    /// Terminal.
    fn on_done(&mut self) {
        // Default implementation does nothing.
    }
}

/// Interface to be implemented to receive the output of a [`WsClient`](crate::transport::WsClient).
///
/// All methods are called on the transport thread. `on_open` precedes every `on_text`;
/// `on_error` is called at most once and nothing follows it.
pub trait WsListener: Send {
    /// Event handler called once the WebSocket handshake succeeded.
    fn on_open(&mut self) {
        // Default implementation does nothing.
    }

    /// Event handler called once per CRLF terminated line received over the socket.
    fn on_text(&mut self, _line: &str) {
        // Default implementation does nothing.
    }

    /// Event handler called once when the handshake or the receive loop failed. Terminal.
    fn on_error(&mut self, _message: &str) {
        // Default implementation does nothing.
    }
}

/// Events forwarded by the channel listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The WebSocket handshake succeeded.
    Open,
    /// One received line.
    Text(String),
    /// The transport failed with the given message.
    Error(String),
    /// The HTTP response ended.
    Done,
}

/// [`HttpListener`] that forwards every event to an unbounded channel.
///
/// # Examples
///
/// ```ignore
/// use lightstreamer_transport::transport::ChannelHttpListener;
///
/// let (listener, mut rx) = ChannelHttpListener::create_channel();
/// let client = HttpClient::new(url, body, options, Box::new(listener))?;
/// client.start()?;
///
/// tokio::spawn(async move {
///     while let Some(event) = rx.recv().await {
///         println!("Received event: {:?}", event);
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ChannelHttpListener {
    sender: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelHttpListener {
    pub fn new(sender: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { sender }
    }

    /// Creates a new channel pair and returns both the listener and the receiver.
    pub fn create_channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl HttpListener for ChannelHttpListener {
    // If send fails, the receiver has been dropped, which is acceptable
    fn on_text(&mut self, line: &str) {
        let _ = self.sender.send(TransportEvent::Text(line.to_string()));
    }

    fn on_error(&mut self, message: &str) {
        let _ = self.sender.send(TransportEvent::Error(message.to_string()));
    }

    fn on_done(&mut self) {
        let _ = self.sender.send(TransportEvent::Done);
    }
}

/// [`WsListener`] that forwards every event to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelWsListener {
    sender: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelWsListener {
    pub fn new(sender: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { sender }
    }

    /// Creates a new channel pair and returns both the listener and the receiver.
    pub fn create_channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl WsListener for ChannelWsListener {
    fn on_open(&mut self) {
        let _ = self.sender.send(TransportEvent::Open);
    }

    fn on_text(&mut self, line: &str) {
        let _ = self.sender.send(TransportEvent::Text(line.to_string()));
    }

    fn on_error(&mut self, message: &str) {
        let _ = self.sender.send(TransportEvent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl HttpListener for Silent {}
    impl WsListener for Silent {}

    #[test]
    fn test_default_methods_do_nothing() {
        let mut listener = Silent;
        HttpListener::on_text(&mut listener, "x");
        HttpListener::on_error(&mut listener, "e");
        listener.on_done();
        listener.on_open();
        WsListener::on_text(&mut listener, "x");
        WsListener::on_error(&mut listener, "e");
    }

    #[test]
    fn test_channel_http_listener() {
        let (mut listener, mut rx) = ChannelHttpListener::create_channel();
        listener.on_text("line");
        listener.on_error("boom");
        listener.on_done();
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Text("line".to_string()));
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Error("boom".to_string()));
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Done);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_ws_listener() {
        let (mut listener, mut rx) = ChannelWsListener::create_channel();
        listener.on_open();
        listener.on_text("a");
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Open);
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Text("a".to_string()));
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (mut listener, rx) = ChannelWsListener::create_channel();
        drop(rx);
        listener.on_open();
        listener.on_error("ignored");
    }
}
