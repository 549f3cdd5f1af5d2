use crate::error::{AvrError, Result};
use crate::health::ProbeToken;
use crate::protocol::Command;
use crate::session::Session;
use crate::state::DeviceState;
use crate::transport::Transport;
use crate::types::LinkState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

const REQUEST_QUEUE: usize = 32;
const READ_BUF: usize = 1024;

/// A request sent from the client to the driver task
pub(crate) enum Request {
    Send {
        command: Command,
        reply: oneshot::Sender<Result<()>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<()>>,
    },
    SetHealthCheck {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<DeviceState>,
    },
}

/// Handle to the driver task
pub(crate) struct Driver {
    pub tx: mpsc::Sender<Request>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

impl Driver {
    /// Send a request and wait for its reply
    pub async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Request) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| AvrError::ConnectionClosed)?;
        reply_rx.await.map_err(|_| AvrError::ConnectionClosed)
    }

    /// Stop the task, closing the link first
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("driver task failed: {}", e);
        }
    }
}

/// Spawn the task that owns the session
pub(crate) fn spawn_driver<T: Transport + 'static>(session: Session<T>) -> Driver {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(drive(session, rx, cancel.clone()));
    Driver { tx, cancel, task }
}

async fn probe_timer(deadline: Option<(Instant, ProbeToken)>) -> ProbeToken {
    match deadline {
        Some((at, token)) => {
            sleep_until(at).await;
            token
        }
        None => std::future::pending().await,
    }
}

/// Driver loop.
///
/// Priority, highest first: cancellation, client requests, the probe
/// timer, reading whatever the receiver sent.
async fn drive<T: Transport>(
    mut session: Session<T>,
    mut rx: mpsc::Receiver<Request>,
    cancel: CancellationToken,
) {
    if let Err(e) = session.open(Instant::now()).await {
        tracing::warn!("initial open failed, the watchdog will retry: {}", e);
    }

    let mut buf = [0u8; READ_BUF];

    loop {
        let deadline = session.probe_deadline();
        let open = session.link() == LinkState::Open;

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("driver cancelled");
                break;
            }

            request = rx.recv() => {
                match request {
                    Some(request) => handle_request(&mut session, request).await,
                    None => {
                        tracing::debug!("request channel closed, stopping driver");
                        break;
                    }
                }
            }

            token = probe_timer(deadline) => {
                session.on_probe_timer(token, Instant::now()).await;
            }

            result = session.read_raw(&mut buf), if open => {
                if let Err(e) = session.on_read(result, &buf, Instant::now()).await {
                    tracing::debug!("read failed: {}", e);
                }
            }
        }
    }

    if let Err(e) = session.close().await {
        tracing::warn!("close failed: {}", e);
    }
}

async fn handle_request<T: Transport>(session: &mut Session<T>, request: Request) {
    let now = Instant::now();
    match request {
        Request::Send { command, reply } => {
            let _ = reply.send(session.send(command, now).await);
        }
        Request::Refresh { reply } => {
            let _ = reply.send(session.refresh_status(now).await);
        }
        Request::SetHealthCheck { enabled, reply } => {
            session.set_health_check(enabled, now);
            let _ = reply.send(());
        }
        Request::Snapshot { reply } => {
            let _ = reply.send(session.state().clone());
        }
    }
}
