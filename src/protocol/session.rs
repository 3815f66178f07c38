use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::frame;

/// Connection lifecycle. Every close or error resets to `Disconnected`; the
/// session task then dials again unless it has been told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Joined,
}

/// Receives every inbound binary frame. The join handshake itself is consumed
/// by the session; `joined` reports the session's state at delivery time.
pub trait FrameHandler: Send + 'static {
    fn on_frame(&mut self, frame: &[u8], joined: bool);
}

impl<F: FnMut(&[u8], bool) + Send + 'static> FrameHandler for F {
    fn on_frame(&mut self, frame: &[u8], joined: bool) {
        self(frame, joined)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full WebSocket URL, e.g. `wss://ourworldofpixels.com/main`.
    pub url: String,
    /// Canvas name sent in the join frame.
    pub canvas: String,
    /// Delay before re-dialing after a close or error.
    pub reconnect_delay: Duration,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>, canvas: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            canvas: canvas.into(),
            reconnect_delay: Duration::from_secs(1),
        }
    }

    /// Canvas URL on the standard server layout: `wss://<host>/<canvas>`.
    pub fn for_host(host: &str, canvas: &str) -> Self {
        Self::new(format!("wss://{host}/{canvas}"), canvas)
    }
}

type Outbound = Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>;

/// Handle to the spawned connection task.
///
/// The task owns the socket and keeps reconnecting until `shutdown`; the
/// decision that the work is finished belongs to the caller, not to the
/// close/error path.
pub struct Session {
    outbound: Outbound,
    state_rx: watch::Receiver<SessionState>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Session {
    pub fn spawn(config: SessionConfig, handler: impl FrameHandler) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (stop_tx, stop_rx) = watch::channel(false);
        let outbound: Outbound = Arc::new(Mutex::new(None));
        let task = tokio::spawn(run(config, handler, state_tx, stop_rx, outbound.clone()));
        Self { outbound, state_rx, stop_tx, task }
    }

    /// Watch receiver over the session state.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn is_joined(&self) -> bool {
        *self.state_rx.borrow() == SessionState::Joined
    }

    /// Queue a frame for sending. Fails with `NotJoined` while no joined
    /// connection exists; callers treat that as transient and retry later.
    pub fn send(&self, frame: Vec<u8>) -> Result<()> {
        let guard = self.outbound.lock().unwrap();
        let tx = guard.as_ref().ok_or(Error::NotJoined)?;
        tx.send(Message::Binary(frame)).map_err(|_| Error::NotJoined)
    }

    /// Block until the session reports `Joined`.
    pub async fn wait_joined(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|s| *s == SessionState::Joined).await;
    }

    /// Stop reconnecting, close the socket, and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

async fn run(
    config: SessionConfig,
    mut handler: impl FrameHandler,
    state_tx: watch::Sender<SessionState>,
    mut stop_rx: watch::Receiver<bool>,
    outbound: Outbound,
) {
    'dial: loop {
        if *stop_rx.borrow() {
            break;
        }
        let _ = state_tx.send(SessionState::Connecting);
        debug!(url = %config.url, "connecting");
        let ws = tokio::select! {
            _ = async { let _ = stop_rx.wait_for(|stop| *stop).await; } => break 'dial,
            conn = connect_async(config.url.as_str()) => match conn {
                Ok((ws, _)) => ws,
                Err(err) => {
                    warn!("connect failed: {err}");
                    let _ = state_tx.send(SessionState::Disconnected);
                    tokio::time::sleep(config.reconnect_delay).await;
                    continue;
                }
            }
        };
        let _ = state_tx.send(SessionState::Handshaking);

        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut joined = false;

        let stopped = loop {
            tokio::select! {
                _ = async { let _ = stop_rx.wait_for(|stop| *stop).await; } => {
                    let _ = sink.close().await;
                    break true;
                }
                Some(msg) = rx.recv() => {
                    if let Err(err) = sink.send(msg).await {
                        warn!("send failed: {err}");
                        break false;
                    }
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Binary(data))) => {
                        if !joined && frame::is_server_hello(&data) {
                            match sink.send(Message::Binary(frame::join_frame(&config.canvas))).await {
                                Ok(()) => {
                                    joined = true;
                                    *outbound.lock().unwrap() = Some(tx.clone());
                                    let _ = state_tx.send(SessionState::Joined);
                                    info!(canvas = %config.canvas, "joined canvas");
                                }
                                Err(err) => {
                                    warn!("join failed: {err}");
                                    break false;
                                }
                            }
                        } else {
                            handler.on_frame(&data, joined);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("server closed connection");
                        break false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!("receive error: {err}");
                        break false;
                    }
                }
            }
        };

        // Queued outbound frames die with this connection; unacknowledged
        // chunks stay pending in coverage and get re-requested.
        *outbound.lock().unwrap() = None;
        let _ = state_tx.send(SessionState::Disconnected);
        if stopped || *stop_rx.borrow() {
            break;
        }
        info!("connection lost, reconnecting in {:?}", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
    let _ = state_tx.send(SessionState::Disconnected);
}
