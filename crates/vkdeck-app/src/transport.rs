use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};

use vkdeck_core::{GatewayError, Transport};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
struct Request<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Response {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Callers waiting for a reply, keyed by request id. Once the reader stops the table is
/// closed and refuses new entries.
#[derive(Default)]
struct Pending {
    table: SyncMutex<PendingTable>,
}

#[derive(Default)]
struct PendingTable {
    waiting: HashMap<u64, oneshot::Sender<Response>>,
    closed: bool,
}

impl Pending {
    fn register(
        self: &Arc<Self>,
        id: u64,
        tx: oneshot::Sender<Response>,
    ) -> Result<PendingGuard, GatewayError> {
        let mut table = self.table.lock();
        if table.closed {
            return Err(GatewayError::Closed);
        }
        table.waiting.insert(id, tx);
        Ok(PendingGuard {
            id,
            pending: Arc::clone(self),
        })
    }

    fn complete(&self, id: u64) -> Option<oneshot::Sender<Response>> {
        self.table.lock().waiting.remove(&id)
    }

    /// Dropping the senders wakes every waiting caller with `Closed`.
    fn close(&self) {
        let mut table = self.table.lock();
        table.closed = true;
        table.waiting.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().waiting.len()
    }
}

/// Removes the caller's entry however `call` ends, including when its future is dropped.
struct PendingGuard {
    id: u64,
    pending: Arc<Pending>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.complete(self.id);
    }
}

/// Line-delimited JSON-RPC 2.0 over a byte stream pair, normally a backend process's
/// stdin/stdout. Requests are matched to responses by id, so calls may overlap.
pub struct StdioTransport {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    next_id: AtomicU64,
    pending: Arc<Pending>,
    // Held so the backend lives exactly as long as the transport.
    _child: Mutex<Option<Child>>,
}

impl StdioTransport {
    pub fn new<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let pending = Arc::new(Pending::default());
        tokio::spawn(read_responses(reader, Arc::clone(&pending)));

        Self {
            writer: Mutex::new(Box::new(writer)),
            next_id: AtomicU64::new(1),
            pending,
            _child: Mutex::new(None),
        }
    }

    /// Starts `command` and talks to it over its stdio. The child is killed when the transport
    /// is dropped.
    pub fn spawn(command: &[String]) -> Result<Self, AppError> {
        let (program, args) = command.split_first().ok_or(AppError::EmptyBackendCommand)?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AppError::SpawnBackend {
                program: program.clone(),
                source,
            })?;
        let stdin = child.stdin.take().ok_or(AppError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(AppError::MissingPipe("stdout"))?;
        log::info!("started backend {program} (pid {:?})", child.id());

        let transport = Self::new(stdin, stdout);
        Ok(Self {
            _child: Mutex::new(Some(child)),
            ..transport
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn call(&self, method: &'static str, params: Vec<Value>) -> Result<Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|source| GatewayError::Decode { method, source })?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        // Registered before writing so a fast reply cannot miss us.
        let _registered = self.pending.register(id, tx)?;

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(line.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(error) => Err(error),
            }
        };
        if let Err(error) = written {
            return Err(GatewayError::Transport {
                method,
                message: error.to_string(),
            });
        }

        let response = rx.await.map_err(|_| GatewayError::Closed)?;
        if let Some(error) = response.error {
            return Err(GatewayError::Backend {
                method,
                message: format!("{} (code {})", error.message, error.code),
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

async fn read_responses<R>(reader: R, pending: Arc<Pending>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let response: Response = match serde_json::from_str(line) {
                    Ok(response) => response,
                    Err(error) => {
                        log::error!("unparseable backend message: {error}");
                        continue;
                    }
                };
                let Some(id) = response.id else {
                    log::debug!("ignoring backend message without id");
                    continue;
                };
                match pending.complete(id) {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => log::warn!("response for unknown request id {id}"),
                }
            }
            Ok(None) => {
                log::warn!("backend closed its output");
                break;
            }
            Err(error) => {
                log::error!("reading from backend failed: {error}");
                break;
            }
        }
    }
    pending.close();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::time::timeout;

    use vkdeck_core::{GatewayError, Transport};

    use super::StdioTransport;

    fn pair() -> (StdioTransport, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        let (read, write) = tokio::io::split(client);
        (StdioTransport::new(write, read), server)
    }

    #[tokio::test]
    async fn overlapping_calls_are_matched_by_id() {
        let (transport, server) = pair();
        let backend = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            let mut requests = Vec::new();
            for _ in 0..2 {
                let line = lines.next_line().await.expect("read").expect("request line");
                let request: Value = serde_json::from_str(&line).expect("request json");
                requests.push(request);
            }
            for request in requests.iter().rev() {
                let result = match request["method"].as_str() {
                    Some("list_profiles") => json!(["Sharp"]),
                    _ => json!(true),
                };
                let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": result});
                write
                    .write_all(format!("{reply}\n").as_bytes())
                    .await
                    .expect("write reply");
            }
            requests
        });

        let (profiles, launch) = tokio::join!(
            transport.call("list_profiles", Vec::new()),
            transport.call("set_enable_on_launch", vec![json!(true)]),
        );

        assert_eq!(profiles.expect("profiles"), json!(["Sharp"]));
        assert_eq!(launch.expect("launch"), json!(true));
        let requests = backend.await.expect("backend task");
        assert_eq!(requests[0]["jsonrpc"], "2.0");
        let launch_request = requests
            .iter()
            .find(|request| request["method"] == "set_enable_on_launch")
            .expect("launch request sent");
        assert_eq!(launch_request["params"], json!([true]));
    }

    #[tokio::test]
    async fn error_object_becomes_backend_error() {
        let (transport, server) = pair();
        tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.expect("read").expect("request line");
            let request: Value = serde_json::from_str(&line).expect("request json");
            let reply = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32000, "message": "profile missing"}
            });
            write
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .expect("write reply");
            // Keep the stream open until the client has read the reply.
            let _ = lines.next_line().await;
        });

        let result = transport.call("get_profile_config", vec![json!("Gone")]).await;

        assert!(matches!(
            result,
            Err(GatewayError::Backend { method, ref message })
                if method == "get_profile_config" && message.contains("profile missing")
        ));
    }

    #[tokio::test]
    async fn closed_backend_fails_pending_calls() {
        let (transport, server) = pair();
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            let _ = lines.next_line().await;
            drop(write);
            drop(lines);
        });

        let result = transport.call("list_profiles", Vec::new()).await;

        assert!(matches!(result, Err(GatewayError::Closed)));
    }

    #[tokio::test]
    async fn abandoned_calls_leave_nothing_pending() {
        let (transport, server) = pair();
        let silent = tokio::spawn(async move {
            let mut lines = BufReader::new(server).lines();
            while let Ok(Some(_)) = lines.next_line().await {}
        });

        for _ in 0..3 {
            let result = timeout(
                Duration::from_millis(20),
                transport.call("list_profiles", Vec::new()),
            )
            .await;
            assert!(result.is_err(), "silent backend should not answer");
        }

        assert_eq!(transport.pending.len(), 0);
        silent.abort();
    }

    #[tokio::test]
    async fn calls_after_backend_output_ends_fail_fast() {
        let (client_write, server_read) = tokio::io::duplex(4096);
        let (server_write, client_read) = tokio::io::duplex(4096);
        let transport = StdioTransport::new(client_write, client_read);
        drop(server_write);

        for _ in 0..2 {
            let result = timeout(
                Duration::from_secs(1),
                transport.call("list_profiles", Vec::new()),
            )
            .await
            .expect("call should resolve once the backend is gone");
            assert!(matches!(result, Err(GatewayError::Closed)));
        }
        assert_eq!(transport.pending.len(), 0);
        drop(server_read);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(StdioTransport::spawn(&[]).is_err());
    }
}
