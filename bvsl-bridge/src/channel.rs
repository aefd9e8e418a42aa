//! Newline-delimited JSON channel to the host extension.
//!
//! Requests carry a numeric `id`; the host answers with `{"id", "result"}`
//! or `{"id", "error"}`. Only status queries wait for their answer. Errors
//! the host reports for fire-and-forget commands are forwarded on the
//! rejection channel handed out at construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::service::LoggingService;
use crate::settings::{BridgeSettings, WireEncoding};
use crate::{BridgeError, StatusReport};

type Reply = Result<Value, String>;

/// An error the host returned for a command nobody was waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRejection {
    pub id: u64,
    pub message: String,
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    body: RequestBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestBody<'a> {
    Command(&'a Command),
    Lua { lua: String },
}

#[derive(Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// State shared between the channel handle and its IO tasks.
#[derive(Default)]
struct Shared {
    waiters: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    closed: AtomicBool,
}

impl Shared {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders fails every pending query with `Disconnected`.
        self.waiters.lock().clear();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Removes a status waiter when its query finishes or is dropped.
struct PendingQuery<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingQuery<'_> {
    fn drop(&mut self) {
        self.shared.waiters.lock().remove(&self.id);
    }
}

/// [`LoggingService`] over a byte stream to the host.
pub struct HostChannel {
    outbound: mpsc::UnboundedSender<String>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    encoding: WireEncoding,
}

impl HostChannel {
    /// Connect to the host listener named in `settings`.
    pub async fn connect(
        settings: &BridgeSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RemoteRejection>), BridgeError> {
        let stream = TcpStream::connect(&settings.address).await?;
        stream.set_nodelay(true)?;
        info!(
            "Connected to host at {} ({:?} encoding)",
            settings.address, settings.encoding
        );
        Ok(Self::from_stream(stream, settings.encoding))
    }

    /// Wrap an already-open stream. Must be called inside a tokio runtime.
    pub fn from_stream<S>(
        stream: S,
        encoding: WireEncoding,
    ) -> (Self, mpsc::UnboundedReceiver<RemoteRejection>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (rejections, rejections_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        tokio::spawn(write_loop(writer, outbound_rx, Arc::clone(&shared)));
        tokio::spawn(read_loop(reader, rejections, Arc::clone(&shared)));

        let channel = Self {
            outbound,
            shared,
            next_id: AtomicU64::new(1),
            encoding,
        };
        (channel, rejections_rx)
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn encode(&self, id: u64, command: &Command) -> Result<String, BridgeError> {
        let body = match self.encoding {
            WireEncoding::Json => RequestBody::Command(command),
            WireEncoding::Lua => RequestBody::Lua {
                lua: command.to_lua(),
            },
        };
        Ok(serde_json::to_string(&Request { id, body })?)
    }

    fn dispatch(&self, id: u64, command: &Command) -> Result<(), BridgeError> {
        if self.shared.is_closed() {
            return Err(BridgeError::Disconnected);
        }
        let frame = self.encode(id, command)?;
        debug!(id, op = command.operation(), "-> {}", frame);
        self.outbound
            .send(frame)
            .map_err(|_| BridgeError::Disconnected)
    }
}

#[async_trait]
impl LoggingService for HostChannel {
    fn send(&self, command: Command) -> Result<(), BridgeError> {
        let id = self.allocate_id();
        self.dispatch(id, &command)
    }

    async fn query_status(&self) -> Result<StatusReport, BridgeError> {
        let id = self.allocate_id();
        let (tx, rx) = oneshot::channel();
        self.shared.waiters.lock().insert(id, tx);
        let _pending = PendingQuery {
            shared: &self.shared,
            id,
        };

        self.dispatch(id, &Command::QueryStatus)?;

        match rx.await {
            Ok(Ok(value)) => StatusReport::from_value(value),
            Ok(Err(message)) => Err(BridgeError::Rejected {
                operation: Command::QueryStatus.operation().to_string(),
                message,
            }),
            Err(_) => Err(BridgeError::Disconnected),
        }
    }
}

async fn write_loop<W>(mut writer: W, mut frames: mpsc::UnboundedReceiver<String>, shared: Arc<Shared>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        let written = async {
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!("Host channel write failed: {}", e);
            shared.close();
            return;
        }
    }

    let _ = writer.shutdown().await;
}

async fn read_loop<R>(reader: R, rejections: mpsc::UnboundedSender<RemoteRejection>, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Host closed the channel");
                break;
            }
            Err(e) => {
                warn!("Host channel read failed: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        debug!("<- {}", line);

        let response: Response = match serde_json::from_str(&line) {
            Ok(response) => response,
            Err(e) => {
                warn!("Ignoring unparseable host frame: {}", e);
                continue;
            }
        };

        let reply = match response.error {
            Some(message) => Err(message),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        let waiter = shared.waiters.lock().remove(&response.id);
        match (waiter, reply) {
            (Some(waiter), reply) => {
                let _ = waiter.send(reply);
            }
            (None, Err(message)) => {
                warn!(id = response.id, "Host rejected command: {}", message);
                let _ = rejections.send(RemoteRejection {
                    id: response.id,
                    message,
                });
            }
            (None, Ok(_)) => {}
        }
    }

    shared.close();
}
