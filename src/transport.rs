//! The byte-stream boundary between the session and the CLI subprocess.
//!
//! [`Transport`] is the minimal capability set the rest of the crate depends on:
//! connect, write one frame, read a stream of frames, signal end-of-input, and
//! close. Every method takes `&self` — implementations serialize their own
//! mutable state internally rather than relying on an outer mutex, so a single
//! `Arc<dyn Transport>` can be shared between the session facade, the outbound
//! control client, and the reader task without a second layer of locking at
//! the call site.
//!
//! The default implementation, [`SubprocessTransport`], spawns the CLI via
//! [`tokio::process::Command`] and wraps its stdout with a line-delimited JSON
//! codec that tolerates and skips malformed lines rather than failing the
//! whole stream. [`InMemoryTransport`] is provided for host applications (and
//! this crate's own test suite) that want to drive a [`crate::Client`]
//! without a real subprocess.

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};

/// Bound on the number of parsed frames buffered between the reader task and
/// whatever calls [`Transport::read_stream`].
const READER_CHANNEL_CAPACITY: usize = 256;

/// Opaque bidirectional connection to the CLI subprocess.
///
/// Implementations must serialize concurrent [`Transport::write`] calls, and
/// guard their own connect/close state, internally.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the underlying channels. Idempotent after the first success.
    async fn connect(&self) -> Result<()>;

    /// Serialize and write one frame, terminated by a single `\n`.
    async fn write(&self, frame: &Value) -> Result<()>;

    /// Take the receiving half of the parsed-frame stream. May only succeed
    /// once per connection; a second call returns a `Protocol` error.
    async fn read_stream(&self) -> Result<mpsc::Receiver<Result<Value>>>;

    /// Signal "no more prompts" without tearing down the read side.
    async fn end_input(&self) -> Result<()>;

    /// Terminate the subprocess (or otherwise release resources). Safe to
    /// call multiple times.
    async fn close(&self) -> Result<()>;
}

/// Parse a single NDJSON line. Blank lines are silently ignored; malformed
/// JSON is logged and skipped rather than poisoning the stream.
fn parse_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("skipping malformed NDJSON line: {err}");
            None
        }
    }
}

/// Spawn a background task that reads lines from `reader`, parses each as a
/// frame, and forwards the result on `tx`. Exits cleanly (dropping `tx`) when
/// the underlying stream reaches EOF.
fn spawn_line_reader<R>(mut reader: BufReader<R>, tx: mpsc::Sender<Result<Value>>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(value) = parse_line(&line) {
                        if tx.send(Ok(value)).await.is_err() {
                            break;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(Error::transport(err.to_string()))).await;
                    break;
                }
            }
        }
    });
}

/// Mutable state behind [`SubprocessTransport`]'s single internal mutex.
#[derive(Default)]
struct SubprocessState {
    child: Option<Child>,
    stdin: Option<Arc<Mutex<ChildStdin>>>,
    stdout_rx: Option<mpsc::Receiver<Result<Value>>>,
}

/// Default [`Transport`]: spawns the agent CLI as a child process and wires
/// its stdin/stdout through the NDJSON codec.
pub struct SubprocessTransport {
    cli_path: String,
    cli_args: Vec<String>,
    working_dir: Option<PathBuf>,
    state: Mutex<SubprocessState>,
}

impl SubprocessTransport {
    /// Build a transport for `cli_path`, not yet connected.
    pub fn new(cli_path: impl Into<String>, cli_args: Vec<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            cli_args,
            working_dir: None,
            state: Mutex::new(SubprocessState::default()),
        }
    }

    /// Set the subprocess's working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl Transport for SubprocessTransport {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.child.is_some() {
            return Ok(());
        }

        let mut command = Command::new(&self.cli_path);
        command
            .args(&self.cli_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|err| Error::transport(format!("failed to spawn {}: {err}", self.cli_path)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::transport("child process has no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::transport("child process has no stdout"))?;

        let (tx, rx) = mpsc::channel(READER_CHANNEL_CAPACITY);
        spawn_line_reader(BufReader::new(stdout), tx);

        state.stdin = Some(Arc::new(Mutex::new(stdin)));
        state.stdout_rx = Some(rx);
        state.child = Some(child);

        Ok(())
    }

    async fn write(&self, frame: &Value) -> Result<()> {
        let stdin = {
            let state = self.state.lock().await;
            state
                .stdin
                .clone()
                .ok_or_else(|| Error::transport("transport not connected"))?
        };

        let mut line = serde_json::to_string(frame)?;
        line.push('\n');

        let mut guard = stdin.lock().await;
        guard
            .write_all(line.as_bytes())
            .await
            .map_err(|err| Error::transport(format!("write failed: {err}")))?;
        guard
            .flush()
            .await
            .map_err(|err| Error::transport(format!("flush failed: {err}")))
    }

    async fn read_stream(&self) -> Result<mpsc::Receiver<Result<Value>>> {
        let mut state = self.state.lock().await;
        state
            .stdout_rx
            .take()
            .ok_or_else(|| Error::protocol("read_stream already taken"))
    }

    async fn end_input(&self) -> Result<()> {
        let stdin = {
            let state = self.state.lock().await;
            state
                .stdin
                .clone()
                .ok_or_else(|| Error::transport("transport not connected"))?
        };
        let mut guard = stdin.lock().await;
        guard
            .shutdown()
            .await
            .map_err(|err| Error::transport(format!("shutdown failed: {err}")))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mut child) = state.child.take() {
            let _ = child.kill().await;
        }
        state.stdin = None;
        state.stdout_rx = None;
        Ok(())
    }
}

/// In-memory [`Transport`] pairing a pre-seeded read side with an
/// observable write side. Used by this crate's own tests and available to
/// host applications that want to drive a [`crate::Client`] without a real
/// subprocess.
pub struct InMemoryTransport {
    inbound_rx: Mutex<Option<mpsc::Receiver<Result<Value>>>>,
    outbound_tx: mpsc::Sender<Value>,
}

impl InMemoryTransport {
    /// Build a connected pair: `inbound_tx` feeds frames as if they came from
    /// the CLI's stdout; `outbound_rx` observes every frame written via
    /// [`Transport::write`].
    pub fn pair() -> (Self, mpsc::Sender<Result<Value>>, mpsc::Receiver<Value>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(READER_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(READER_CHANNEL_CAPACITY);
        (
            Self {
                inbound_rx: Mutex::new(Some(inbound_rx)),
                outbound_tx,
            },
            inbound_tx,
            outbound_rx,
        )
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn write(&self, frame: &Value) -> Result<()> {
        self.outbound_tx
            .send(frame.clone())
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn read_stream(&self) -> Result<mpsc::Receiver<Result<Value>>> {
        self.inbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::protocol("read_stream already taken"))
    }

    async fn end_input(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_line_skips_malformed_json() {
        assert!(parse_line("not json").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line(r#"{"type":"result"}"#).is_some());
    }

    #[tokio::test]
    async fn test_in_memory_transport_write_is_observable() {
        let (transport, _inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
        transport.write(&json!({"type": "control_request"})).await.unwrap();
        let observed = outbound_rx.recv().await.unwrap();
        assert_eq!(observed["type"], "control_request");
    }

    #[tokio::test]
    async fn test_in_memory_transport_read_stream_yields_seeded_frames() {
        let (transport, inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        inbound_tx.send(Ok(json!({"type": "result"}))).await.unwrap();
        drop(inbound_tx);

        let mut rx = transport.read_stream().await.unwrap();
        let frame = rx.recv().await.unwrap().unwrap();
        assert_eq!(frame["type"], "result");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_transport_read_stream_can_only_be_taken_once() {
        let (transport, _inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        assert!(transport.read_stream().await.is_ok());
        assert!(transport.read_stream().await.is_err());
    }
}
