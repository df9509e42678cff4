//! Session facade and lifecycle coordinator.
//!
//! [`Client`] is the public entry point: construct from [`crate::ClientOptions`],
//! [`Client::start`] to connect the transport and spin up the reader,
//! [`Client::send`] a prompt and drain [`Client::receive`]/[`Client::receive_turn`],
//! mutate runtime state through the thin control-method wrappers, and
//! [`Client::dispose`] when done. Lifecycle: `Created -> Started -> Initialized
//! -> Disposed`; every transition past `Disposed` is a no-op, and every public
//! method fails fast with [`crate::Error::SessionDisposed`] once reached.

use crate::control::{ControlClient, CorrelationTable};
use crate::handler::QueryHandler;
use crate::hooks::HookRegistry;
use crate::transport::{SubprocessTransport, Transport};
use crate::types::{
    ClientOptions, ControlRequestPayload, ConversationMessage, PermissionMode, UserMessage,
};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a [`Client`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Initialized,
    Disposed,
}

/// Bound on the conversation channel between the reader task and [`Client::receive`].
const CONVERSATION_CHANNEL_CAPACITY: usize = 256;

/// A live session with the agent CLI subprocess.
///
/// Every method takes `&self` — the facade tolerates concurrent calls from
/// multiple host tasks by guarding its mutable state behind internal locks
/// rather than requiring exclusive `&mut` access.
pub struct Client {
    options: ClientOptions,
    transport: Arc<dyn Transport>,
    control: ControlClient,
    table: Arc<CorrelationTable>,
    conversation_rx: Mutex<Option<mpsc::Receiver<crate::handler::ConversationResult>>>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    hook_registry: Mutex<Option<HookRegistry>>,
    cancellation: CancellationToken,
    state: Mutex<SessionState>,
    session_id: Mutex<Option<String>>,
}

impl Client {
    /// Build a client that will spawn `options.cli_path()` as a subprocess.
    pub fn new(options: ClientOptions) -> Self {
        let mut subprocess = SubprocessTransport::new(
            options.cli_path().to_string(),
            options.cli_args().to_vec(),
        );
        if let Some(dir) = options.working_dir() {
            subprocess = subprocess.with_working_dir(dir.as_path().to_path_buf());
        }
        Self::with_transport(options, Arc::new(subprocess))
    }

    /// Build a client over an explicit [`Transport`] — used by host
    /// applications (and this crate's own tests) that want to drive a
    /// session without a real subprocess, e.g. [`crate::transport::InMemoryTransport`].
    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> Self {
        let table = Arc::new(CorrelationTable::new());
        let control = ControlClient::new(transport.clone(), table.clone());
        Self {
            options,
            transport,
            control,
            table,
            conversation_rx: Mutex::new(None),
            reader_handle: Mutex::new(None),
            hook_registry: Mutex::new(None),
            cancellation: CancellationToken::new(),
            state: Mutex::new(SessionState::Created),
            session_id: Mutex::new(None),
        }
    }

    /// The options this session was built from.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    async fn ensure_usable(&self) -> Result<()> {
        match *self.state.lock().await {
            SessionState::Created => Err(Error::NotStarted),
            SessionState::Disposed => Err(Error::SessionDisposed),
            SessionState::Started | SessionState::Initialized => Ok(()),
        }
    }

    /// `Created -> Started`: connect the transport and spawn the reader task.
    /// A no-op if already started.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Disposed => return Err(Error::SessionDisposed),
            SessionState::Created => {}
            SessionState::Started | SessionState::Initialized => return Ok(()),
        }

        self.transport.connect().await?;
        let frames = self.transport.read_stream().await?;

        let registry = HookRegistry::build(self.options.hooks());
        let (tx, rx) = mpsc::channel(CONVERSATION_CHANNEL_CAPACITY);
        let handler = Arc::new(QueryHandler::new(
            self.transport.clone(),
            self.table.clone(),
            tx,
            self.options.permission_callback().cloned(),
            self.options.mcp_handlers().clone(),
            registry.clone(),
            self.options.metrics_sink().cloned(),
            self.cancellation.clone(),
        ));
        let reader = QueryHandler::spawn(handler, frames);

        *self.conversation_rx.lock().await = Some(rx);
        *self.reader_handle.lock().await = Some(reader);
        *self.hook_registry.lock().await = Some(registry);
        *state = SessionState::Started;
        Ok(())
    }

    /// `Started -> Initialized`: send the `initialize` control request with
    /// the hook descriptors built from this session's [`crate::ClientOptions`].
    /// Idempotent — a session already `Initialized` returns immediately
    /// without writing a second request.
    pub async fn initialize(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            match *state {
                SessionState::Disposed => return Err(Error::SessionDisposed),
                SessionState::Created => return Err(Error::NotStarted),
                SessionState::Initialized => return Ok(()),
                SessionState::Started => {}
            }
        }

        let hooks = self
            .hook_registry
            .lock()
            .await
            .as_ref()
            .filter(|registry| !registry.is_empty())
            .map(HookRegistry::to_wire_value);

        self.control
            .call(
                ControlRequestPayload::Initialize { hooks },
                &self.cancellation,
            )
            .await?;

        *self.state.lock().await = SessionState::Initialized;
        Ok(())
    }

    /// Write a `user` frame carrying `prompt` as plain text.
    pub async fn send(&self, prompt: impl Into<String>) -> Result<()> {
        self.ensure_usable().await?;
        let session_id = self.session_id.lock().await.clone();
        let message = UserMessage::text(prompt, session_id);

        let mut frame = serde_json::to_value(&message)?;
        if let Value::Object(map) = &mut frame {
            map.insert("type".to_string(), Value::String("user".to_string()));
        }
        self.transport.write(&frame).await
    }

    /// Pull the next conversation message, or `None` once the CLI's stdout
    /// has closed and every buffered message has been drained.
    pub async fn receive(&self) -> Result<Option<ConversationMessage>> {
        self.ensure_usable().await?;
        let mut guard = self.conversation_rx.lock().await;
        let rx = guard.as_mut().ok_or(Error::NotStarted)?;
        match rx.recv().await {
            Some(Ok(message)) => {
                drop(guard);
                self.remember_session_id(&message).await;
                Ok(Some(message))
            }
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Collect conversation messages until (and including) the `ResultMessage`
    /// that terminates the current turn, or the channel closes.
    pub async fn receive_turn(&self) -> Result<Vec<ConversationMessage>> {
        let mut turn = Vec::new();
        while let Some(message) = self.receive().await? {
            let is_result = matches!(message, ConversationMessage::Result(_));
            turn.push(message);
            if is_result {
                break;
            }
        }
        Ok(turn)
    }

    async fn remember_session_id(&self, message: &ConversationMessage) {
        let observed = match message {
            ConversationMessage::User(m) => m.session_id.clone(),
            ConversationMessage::Assistant(m) => m.session_id.clone(),
            ConversationMessage::System(m) => m
                .data
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            ConversationMessage::Result(m) => Some(m.session_id.clone()),
            ConversationMessage::StreamEvent(m) => m.session_id.clone(),
        };
        if let Some(id) = observed {
            *self.session_id.lock().await = Some(id);
        }
    }

    /// Interrupt the CLI's current turn.
    pub async fn interrupt(&self) -> Result<()> {
        self.ensure_usable().await?;
        self.control
            .call(ControlRequestPayload::Interrupt, &self.cancellation)
            .await?;
        Ok(())
    }

    /// Switch the CLI's runtime permission mode.
    pub async fn set_permission_mode(&self, mode: PermissionMode) -> Result<()> {
        self.ensure_usable().await?;
        self.control
            .call(
                ControlRequestPayload::SetPermissionMode { mode },
                &self.cancellation,
            )
            .await?;
        Ok(())
    }

    /// Switch the CLI's active model.
    pub async fn set_model(&self, model: impl Into<String>) -> Result<()> {
        self.ensure_usable().await?;
        self.control
            .call(
                ControlRequestPayload::SetModel {
                    model: model.into(),
                },
                &self.cancellation,
            )
            .await?;
        Ok(())
    }

    /// Adjust the CLI's extended-thinking token budget.
    pub async fn set_max_thinking_tokens(&self, tokens: u32) -> Result<()> {
        self.ensure_usable().await?;
        self.control
            .call(
                ControlRequestPayload::SetMaxThinkingTokens {
                    max_thinking_tokens: tokens,
                },
                &self.cancellation,
            )
            .await?;
        Ok(())
    }

    /// Roll the working tree back to the state before `user_message_id`.
    pub async fn rewind_files(&self, user_message_id: impl Into<String>) -> Result<Option<Value>> {
        self.ensure_usable().await?;
        self.control
            .call(
                ControlRequestPayload::RewindFiles {
                    user_message_id: user_message_id.into(),
                },
                &self.cancellation,
            )
            .await
    }

    /// Ask the CLI which slash commands it currently supports.
    pub async fn supported_commands(&self) -> Result<Option<Value>> {
        self.ensure_usable().await?;
        self.control
            .call(ControlRequestPayload::SupportedCommands, &self.cancellation)
            .await
    }

    /// Ask the CLI which models it currently supports.
    pub async fn supported_models(&self) -> Result<Option<Value>> {
        self.ensure_usable().await?;
        self.control
            .call(ControlRequestPayload::SupportedModels, &self.cancellation)
            .await
    }

    /// Query the connection status of every configured MCP server.
    pub async fn mcp_server_status(&self) -> Result<Option<Value>> {
        self.ensure_usable().await?;
        self.control
            .call(ControlRequestPayload::McpServerStatus, &self.cancellation)
            .await
    }

    /// Query account/subscription information from the CLI.
    pub async fn account_info(&self) -> Result<Option<Value>> {
        self.ensure_usable().await?;
        self.control
            .call(ControlRequestPayload::AccountInfo, &self.cancellation)
            .await
    }

    /// `* -> Disposed`: cancel the session, drain every pending control
    /// request with [`crate::Error::ConnectionClosed`], close the transport,
    /// and join the reader task. Idempotent.
    pub async fn dispose(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == SessionState::Disposed {
            return Ok(());
        }

        self.cancellation.cancel();
        self.table.shutdown().await;
        self.transport.close().await?;

        if let Some(handle) = self.reader_handle.lock().await.take() {
            let _ = handle.await;
        }
        *self.conversation_rx.lock().await = None;
        *state = SessionState::Disposed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{HookEvent, HookOutput, Hooks};
    use crate::transport::InMemoryTransport;
    use serde_json::json;

    /// Spawn a task that answers every outbound `control_request` with an
    /// immediate success ack, echoing its `request_id`.
    fn auto_ack(
        mut outbound_rx: mpsc::Receiver<Value>,
        inbound_tx: mpsc::Sender<Result<Value>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if frame["type"] == "control_request" {
                    let request_id = frame["request_id"].clone();
                    let ack = json!({
                        "type": "control_response",
                        "response": {
                            "subtype": "success",
                            "request_id": request_id,
                            "response": null,
                        }
                    });
                    if inbound_tx.send(Ok(ack)).await.is_err() {
                        break;
                    }
                }
            }
        })
    }

    fn test_options() -> ClientOptions {
        ClientOptions::builder().cli_path("claude").build().unwrap()
    }

    #[tokio::test]
    async fn test_new_client_starts_in_created_state() {
        let (transport, _inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        let client = Client::with_transport(test_options(), Arc::new(transport));
        assert_eq!(client.state().await, SessionState::Created);
    }

    #[tokio::test]
    async fn test_send_before_start_fails_with_not_started() {
        let (transport, _inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        let client = Client::with_transport(test_options(), Arc::new(transport));
        let err = client.send("hello").await.unwrap_err();
        assert!(matches!(err, Error::NotStarted));
    }

    #[tokio::test]
    async fn test_start_then_initialize_sends_one_initialize_request_with_hooks() {
        let (transport, inbound_tx, outbound_rx) = InMemoryTransport::pair();
        let hooks = Hooks::new().on(HookEvent::PreToolUse, Some("Bash"), |_, _| async {
            HookOutput::allow()
        });
        let options = ClientOptions::builder()
            .cli_path("claude")
            .hooks(hooks)
            .build()
            .unwrap();
        let client = Arc::new(Client::with_transport(options, Arc::new(transport)));

        let _acker = auto_ack(outbound_rx, inbound_tx);

        client.start().await.unwrap();
        assert_eq!(client.state().await, SessionState::Started);

        client.initialize().await.unwrap();
        assert_eq!(client.state().await, SessionState::Initialized);

        // Idempotent re-entry does not error and does not need another ack.
        client.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_turn_stops_at_result_message() {
        let (transport, inbound_tx, outbound_rx) = InMemoryTransport::pair();
        let client = Client::with_transport(test_options(), Arc::new(transport));
        let _acker = auto_ack(outbound_rx, inbound_tx.clone());

        client.start().await.unwrap();

        inbound_tx
            .send(Ok(json!({
                "type": "assistant",
                "content": [{"type": "text", "text": "hi"}],
                "session_id": "s1"
            })))
            .await
            .unwrap();
        inbound_tx
            .send(Ok(json!({
                "type": "result",
                "duration_ms": 10,
                "is_error": false,
                "num_turns": 1,
                "session_id": "s1"
            })))
            .await
            .unwrap();

        let turn = client.receive_turn().await.unwrap();
        assert_eq!(turn.len(), 2);
        assert!(matches!(turn[1], ConversationMessage::Result(_)));
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_blocks_further_use() {
        let (transport, inbound_tx, outbound_rx) = InMemoryTransport::pair();
        let client = Client::with_transport(test_options(), Arc::new(transport));
        let _acker = auto_ack(outbound_rx, inbound_tx);

        client.start().await.unwrap();
        client.dispose().await.unwrap();
        client.dispose().await.unwrap();

        assert_eq!(client.state().await, SessionState::Disposed);
        let err = client.send("hello").await.unwrap_err();
        assert!(matches!(err, Error::SessionDisposed));
    }

    #[tokio::test]
    async fn test_dispose_while_pending_fails_the_awaiter() {
        let (transport, _inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        let client = Arc::new(Client::with_transport(test_options(), Arc::new(transport)));
        client.start().await.unwrap();

        let waiting_client = client.clone();
        let pending = tokio::spawn(async move { waiting_client.interrupt().await });

        // Give the call a moment to register in the correlation table.
        tokio::task::yield_now().await;
        client.dispose().await.unwrap();

        let result = pending.await.unwrap();
        assert!(result.is_err());
    }
}
