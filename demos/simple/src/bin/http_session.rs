use colored::*;
use lightstreamer_transport::transport::{HttpClient, HttpListener, TransportOptions};
use lightstreamer_transport::utils::{encode_form, setup_logger};
use std::sync::mpsc;
use tracing::{error, info};

const SERVER: &str =
    "https://push.lightstreamer.com/lightstreamer/create_session.txt?LS_protocol=TLCP-2.5.0";

/// Prints every line of the response and signals the end of the request.
struct PrintingListener {
    finished: mpsc::Sender<()>,
    lines: usize,
}

impl HttpListener for PrintingListener {
    fn on_text(&mut self, line: &str) {
        self.lines += 1;
        info!("<< {}", line.bright_white());
    }

    fn on_error(&mut self, message: &str) {
        error!("{}", format!("Request failed: {}", message).red());
        let _ = self.finished.send(());
    }

    fn on_done(&mut self) {
        info!("{}", format!("Response completed ({} lines)", self.lines).bright_green());
        let _ = self.finished.send(());
    }
}

/// Example creating a polling TLCP session with a single HTTP request.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger();

    let body = encode_form(&[
        ("LS_cid", "mgQkwtwdysogQz2BJ4Ji kOj2Bg"),
        ("LS_adapter_set", "DEMO"),
        ("LS_polling", "true"),
        ("LS_polling_millis", "0"),
        ("LS_idle_millis", "0"),
    ])?;

    let (tx, rx) = mpsc::channel();
    let listener = PrintingListener {
        finished: tx,
        lines: 0,
    };
    let client = HttpClient::new(SERVER, body, TransportOptions::new(), Box::new(listener))?;
    client.start()?;

    rx.recv()?;
    client.dispose();
    Ok(())
}
