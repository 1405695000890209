use colored::*;
use lightstreamer_transport::transport::{
    ChannelWsListener, TransportEvent, TransportOptions, WsClient,
};
use lightstreamer_transport::utils::{encode_form, setup_logger};
use std::time::Duration;
use tracing::{error, info, warn};

const SERVER: &str = "wss://push.lightstreamer.com/lightstreamer";
const SUB_PROTOCOL: &str = "TLCP-2.5.0.lightstreamer.com";

/// Example opening a TLCP session over a WebSocket.
///
/// The transport thread delivers every server line through a channel; the main task sends
/// the session creation request once the socket is open and prints what comes back for a
/// few seconds.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger();

    let (listener, mut events) = ChannelWsListener::create_channel();
    let client = WsClient::new(
        SERVER,
        SUB_PROTOCOL,
        TransportOptions::new(),
        Box::new(listener),
    )?;
    client.connect()?;
    info!("{}", format!("Connecting to {}", client.url()).bright_cyan());

    let create_session = encode_form(&[
        ("LS_cid", "mgQkwtwdysogQz2BJ4Ji kOj2Bg"),
        ("LS_adapter_set", "DEMO"),
        ("LS_send_sync", "false"),
    ])?;

    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!("{}", "Time is up, closing the session".yellow());
                break;
            }
            event = events.recv() => match event {
                Some(TransportEvent::Open) => {
                    info!("{}", "WebSocket open".bright_green().bold());
                    client.send("wsok");
                    client.send(format!("create_session\r\n{}", create_session));
                }
                Some(TransportEvent::Text(line)) => info!("<< {}", line.bright_white()),
                Some(TransportEvent::Error(message)) => {
                    error!("{}", format!("Session failed: {}", message).red());
                    break;
                }
                Some(TransportEvent::Done) | None => break,
            }
        }
    }

    tokio::task::spawn_blocking(move || client.dispose()).await?;
    info!("{}", "Client disposed".bright_green());
    Ok(())
}
