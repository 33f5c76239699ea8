//! In-process cable server for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use codecamp_sdk::ws::CableConfig;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
enum Control {
    Send(String),
    CloseAll,
}

#[derive(Default)]
struct State {
    reject: bool,
    accepted: AtomicUsize,
    pings: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

/// Mock cable server: greets with `welcome`, answers every `subscribe` and
/// records all client commands.
pub struct MockCable {
    addr: SocketAddr,
    url: String,
    state: Arc<State>,
    control: broadcast::Sender<Control>,
    task: JoinHandle<()>,
}

impl MockCable {
    /// Starts a server that confirms every subscription.
    pub async fn start() -> Self {
        Self::spawn(false, "127.0.0.1:0".parse().expect("addr")).await
    }

    /// Starts a confirming server on a fixed address, e.g. one that was
    /// stopped earlier.
    pub async fn start_at(addr: SocketAddr) -> Self {
        Self::spawn(false, addr).await
    }

    /// Starts a server that rejects every subscription.
    pub async fn start_rejecting() -> Self {
        Self::spawn(true, "127.0.0.1:0".parse().expect("addr")).await
    }

    async fn spawn(reject: bool, bind: SocketAddr) -> Self {
        init_tracing();

        let listener = TcpListener::bind(bind).await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state = Arc::new(State {
            reject,
            ..State::default()
        });
        let (control, _) = broadcast::channel(64);

        let task = {
            let state = Arc::clone(&state);
            let control = control.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, Arc::clone(&state), control.subscribe()));
                }
            })
        };

        Self {
            addr,
            url: format!("ws://{addr}/cable"),
            state,
            control,
            task,
        }
    }

    /// Returns the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the cable URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns a fast-reconnecting client configuration for this server.
    pub fn config(&self) -> CableConfig {
        CableConfig::new(self.url.clone())
            .without_heartbeat()
            .with_reconnect_delay(Duration::from_millis(50))
            .with_max_reconnect_delay(Duration::from_millis(200))
            .with_connect_timeout(Duration::from_secs(5))
    }

    /// Returns the number of sockets accepted so far.
    pub fn connections(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// Returns the number of ping frames received so far.
    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    /// Returns every command received so far.
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().expect("received").clone()
    }

    /// Returns the received commands named `command`.
    pub fn commands(&self, command: &str) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|c| c["command"] == command)
            .collect()
    }

    /// Sends a frame to every open socket.
    pub fn push(&self, frame: Value) {
        let _ = self.control.send(Control::Send(frame.to_string()));
    }

    /// Closes every open socket; the server keeps accepting.
    pub fn drop_connections(&self) {
        let _ = self.control.send(Control::CloseAll);
    }

    /// Stops listening and closes every open socket, so dials are refused.
    pub async fn stop(&mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        self.drop_connections();
    }
}

impl Drop for MockCable {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, state: Arc<State>, mut control: broadcast::Receiver<Control>) {
    let Ok(socket) = accept_async(stream).await else {
        return;
    };
    state.accepted.fetch_add(1, Ordering::SeqCst);
    let (mut sink, mut source) = socket.split();

    let welcome = json!({"type": "welcome"}).to_string();
    if sink.send(Message::Text(welcome.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let Ok(command) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    state.received.lock().expect("received").push(command.clone());

                    if command["command"] == "subscribe" {
                        let kind = if state.reject {
                            "reject_subscription"
                        } else {
                            "confirm_subscription"
                        };
                        let reply = json!({"type": kind, "identifier": command["identifier"]});
                        if sink.send(Message::Text(reply.to_string().into())).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Ok(Message::Ping(_))) => {
                    state.pings.fetch_add(1, Ordering::SeqCst);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
            control = control.recv() => match control {
                Ok(Control::Send(text)) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                Ok(Control::CloseAll) | Err(_) => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
        }
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Awaits `future` for at most five seconds.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}
