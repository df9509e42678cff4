//! The message classifier/reader task and the inbound control server.
//!
//! [`QueryHandler`] owns the single long-running reader that drains
//! [`crate::transport::Transport::read_stream`], classifies each frame, and
//! either completes a pending outbound control request, dispatches a
//! CLI-initiated control request to a detached task, or forwards a
//! conversation message to the bounded channel [`crate::Client`] drains.

use crate::control::CorrelationTable;
use crate::hooks::{HookContext, HookRegistry};
use crate::transport::Transport;
use crate::types::{
    ConversationMessage, Frame, InboundControlPayload, McpHandler, PermissionCallback,
    PermissionResult, ResultMessage,
};
use crate::types::MetricsSink;
use crate::{Error, Result};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// What the reader hands to [`crate::Client::receive`].
pub type ConversationResult = Result<ConversationMessage>;

#[derive(Default)]
struct SessionInfo {
    session_id: Option<String>,
    cwd: Option<String>,
}

/// The reader task plus the inbound control dispatchers it spawns.
pub struct QueryHandler {
    transport: Arc<dyn Transport>,
    table: Arc<CorrelationTable>,
    conversation_tx: mpsc::Sender<ConversationResult>,
    permission_callback: Option<PermissionCallback>,
    mcp_handlers: HashMap<String, McpHandler>,
    hook_registry: HookRegistry,
    metrics_sink: Option<MetricsSink>,
    session_info: Mutex<SessionInfo>,
    cancellation: CancellationToken,
}

impl QueryHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn Transport>,
        table: Arc<CorrelationTable>,
        conversation_tx: mpsc::Sender<ConversationResult>,
        permission_callback: Option<PermissionCallback>,
        mcp_handlers: HashMap<String, McpHandler>,
        hook_registry: HookRegistry,
        metrics_sink: Option<MetricsSink>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            transport,
            table,
            conversation_tx,
            permission_callback,
            mcp_handlers,
            hook_registry,
            metrics_sink,
            session_info: Mutex::new(SessionInfo::default()),
            cancellation,
        }
    }

    /// Spawn the reader loop over `frames`. Returns once the transport's
    /// stream ends, errors, or session cancellation fires; drains the
    /// correlation table with [`Error::ConnectionClosed`] before returning.
    pub fn spawn(
        handler: Arc<QueryHandler>,
        mut frames: mpsc::Receiver<Result<Value>>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = handler.cancellation.cancelled() => {
                        log::debug!("reader task cancelled");
                        break;
                    }

                    frame = frames.recv() => {
                        match frame {
                            Some(Ok(value)) => {
                                let handler = handler.clone();
                                handler.handle_raw_frame(value).await;
                            }
                            Some(Err(err)) => {
                                log::error!("transport read error: {err}");
                                let _ = handler.conversation_tx.send(Err(err)).await;
                                break;
                            }
                            None => {
                                log::debug!("transport stream ended");
                                break;
                            }
                        }
                    }
                }
            }

            handler.table.shutdown().await;
        })
    }

    async fn handle_raw_frame(self: Arc<Self>, value: Value) {
        let frame: Frame = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("dropping unparseable frame: {err}");
                return;
            }
        };

        match frame {
            Frame::ControlResponse(response_frame) => {
                let request_id = response_frame.response.request_id().to_string();
                if !self.table.complete(response_frame.response).await {
                    log::warn!("control_response for unknown request_id {request_id}");
                }
            }
            Frame::ControlRequest(request_frame) => {
                let handler = self.clone();
                tokio::spawn(async move {
                    handler.dispatch_control_request(request_frame).await;
                });
            }
            Frame::User(msg) => {
                self.remember_session(&msg.session_id, None).await;
                self.forward(ConversationMessage::User(msg)).await;
            }
            Frame::Assistant(msg) => {
                self.remember_session(&msg.session_id, None).await;
                self.forward(ConversationMessage::Assistant(msg)).await;
            }
            Frame::System(msg) => {
                let cwd = msg.data.get("cwd").and_then(Value::as_str).map(str::to_string);
                let session_id = msg
                    .data
                    .get("session_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                self.remember_session(&session_id, cwd).await;
                self.forward(ConversationMessage::System(msg)).await;
            }
            Frame::Result(msg) => {
                self.remember_session(&Some(msg.session_id.clone()), None).await;
                self.notify_metrics(&msg);
                self.forward(ConversationMessage::Result(msg)).await;
            }
            Frame::StreamEvent(msg) => {
                self.remember_session(&msg.session_id, None).await;
                self.forward(ConversationMessage::StreamEvent(msg)).await;
            }
            Frame::Unknown => {
                log::warn!("dropping frame with unrecognised type");
            }
        }
    }

    async fn remember_session(&self, session_id: &Option<String>, cwd: Option<String>) {
        if session_id.is_none() && cwd.is_none() {
            return;
        }
        let mut info = self.session_info.lock().await;
        if let Some(id) = session_id {
            info.session_id = Some(id.clone());
        }
        if let Some(cwd) = cwd {
            info.cwd = Some(cwd);
        }
    }

    async fn forward(&self, message: ConversationMessage) {
        if self.conversation_tx.send(Ok(message)).await.is_err() {
            log::debug!("conversation receiver dropped");
        }
    }

    fn notify_metrics(&self, result: &ResultMessage) {
        if let Some(sink) = self.metrics_sink.clone() {
            let result = result.clone();
            tokio::spawn(async move {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink(&result)));
                if outcome.is_err() {
                    log::error!("metrics sink panicked");
                }
            });
        }
    }

    async fn dispatch_control_request(
        self: Arc<Self>,
        frame: crate::types::ControlRequestFrame,
    ) {
        let request_id = frame.request_id.clone();
        let cancellation = self.cancellation.child_token();

        let outcome: Result<Value> = match frame.request {
            InboundControlPayload::CanUseTool {
                tool_name,
                input,
                permission_suggestions,
                blocked_path,
            } => {
                self.dispatch_can_use_tool(
                    tool_name,
                    input,
                    permission_suggestions.unwrap_or_default(),
                    blocked_path,
                )
                .await
            }
            InboundControlPayload::HookCallback {
                callback_id,
                tool_use_id,
                input,
            } => {
                self.dispatch_hook_callback(callback_id, tool_use_id, input, cancellation)
                    .await
            }
            InboundControlPayload::McpMessage {
                server_name,
                message,
            } => self.dispatch_mcp_message(server_name, message).await,
            InboundControlPayload::Unknown => {
                Err(Error::protocol("unrecognised control_request subtype"))
            }
        };

        self.write_response(request_id, outcome).await;
    }

    async fn dispatch_can_use_tool(
        &self,
        tool_name: String,
        input: Value,
        suggestions: Vec<Value>,
        blocked_path: Option<String>,
    ) -> Result<Value> {
        let result = match &self.permission_callback {
            Some(callback) => callback(tool_name, input, suggestions, blocked_path).await,
            None => PermissionResult::allow(),
        };
        serde_json::to_value(result).map_err(Error::from)
    }

    async fn dispatch_hook_callback(
        &self,
        callback_id: String,
        tool_use_id: Option<String>,
        input: Value,
        cancellation: CancellationToken,
    ) -> Result<Value> {
        let Some(registered) = self.hook_registry.get(&callback_id) else {
            log::warn!("unknown hook callback_id {callback_id}");
            return Ok(serde_json::json!({"continue": true}));
        };

        let hook_input: crate::hooks::HookInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(err) => {
                log::warn!("failed to parse hook input: {err}");
                return Ok(serde_json::json!({"continue": true}));
            }
        };

        let (session_id, cwd) = {
            let info = self.session_info.lock().await;
            (info.session_id.clone(), info.cwd.clone())
        };
        let context = HookContext::new(session_id, cwd, tool_use_id, Some(cancellation));

        let invocation =
            std::panic::AssertUnwindSafe((registered.handler)(hook_input, context)).catch_unwind();

        match tokio::time::timeout(registered.timeout, invocation).await {
            Ok(Ok(output)) => Ok(hook_output_to_wire(output)),
            Ok(Err(_panic)) => {
                log::error!("hook callback {callback_id} panicked");
                Ok(serde_json::json!({"continue": true, "reason": "hook callback panicked"}))
            }
            Err(_elapsed) => {
                log::warn!("hook callback {callback_id} timed out");
                Ok(serde_json::json!({"continue": true, "reason": "hook callback timed out"}))
            }
        }
    }

    async fn dispatch_mcp_message(&self, server_name: String, message: Value) -> Result<Value> {
        match self.mcp_handlers.get(&server_name) {
            Some(handler) => handler(message).await,
            None => Err(Error::other(format!(
                "MCP server '{server_name}' is not registered"
            ))),
        }
    }

    async fn write_response(&self, request_id: String, outcome: Result<Value>) {
        let frame = match outcome {
            Ok(response) => serde_json::json!({
                "type": "control_response",
                "response": {
                    "subtype": "success",
                    "request_id": request_id,
                    "response": response,
                }
            }),
            Err(err) => serde_json::json!({
                "type": "control_response",
                "response": {
                    "subtype": "error",
                    "request_id": request_id,
                    "error": err.to_string(),
                }
            }),
        };

        if let Err(err) = self.transport.write(&frame).await {
            log::error!("failed to write control_response: {err}");
        }
    }
}

/// Serialize a [`crate::hooks::HookOutput`], defaulting `continue` to `true`
/// when the host left it unset.
fn hook_output_to_wire(output: crate::hooks::HookOutput) -> Value {
    let mut value = serde_json::to_value(output).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.entry("continue").or_insert(Value::Bool(true));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{HookEvent, HookOutput, Hooks};
    use crate::transport::InMemoryTransport;
    use serde_json::json;

    fn noop_handler(
        transport: Arc<dyn Transport>,
        table: Arc<CorrelationTable>,
        permission_callback: Option<PermissionCallback>,
        hook_registry: HookRegistry,
    ) -> (Arc<QueryHandler>, mpsc::Receiver<ConversationResult>) {
        let (tx, rx) = mpsc::channel(16);
        let handler = Arc::new(QueryHandler::new(
            transport,
            table,
            tx,
            permission_callback,
            HashMap::new(),
            hook_registry,
            None,
            CancellationToken::new(),
        ));
        (handler, rx)
    }

    #[tokio::test]
    async fn test_unknown_frame_type_is_dropped_not_fatal() {
        let (transport, _inbound_tx, _outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());
        let (handler, mut rx) = noop_handler(transport, table, None, HookRegistry::default());

        handler
            .clone()
            .handle_raw_frame(json!({"type": "totally_new_type"}))
            .await;
        handler
            .clone()
            .handle_raw_frame(json!({
                "type": "result",
                "duration_ms": 5,
                "is_error": false,
                "num_turns": 1,
                "session_id": "s1"
            }))
            .await;

        let message = rx.recv().await.unwrap().unwrap();
        assert!(matches!(message, ConversationMessage::Result(_)));
    }

    #[tokio::test]
    async fn test_can_use_tool_defaults_to_allow_with_no_callback() {
        let (transport, _inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());
        let (handler, _rx) = noop_handler(transport, table, None, HookRegistry::default());

        handler
            .clone()
            .dispatch_control_request(crate::types::ControlRequestFrame {
                request_id: "r1".to_string(),
                request: InboundControlPayload::CanUseTool {
                    tool_name: "Bash".to_string(),
                    input: json!({"command": "ls"}),
                    permission_suggestions: None,
                    blocked_path: None,
                },
            })
            .await;

        let response = outbound_rx.recv().await.unwrap();
        assert_eq!(response["response"]["subtype"], "success");
        assert_eq!(response["response"]["response"]["behavior"], "allow");
    }

    #[tokio::test]
    async fn test_hook_callback_unknown_id_is_lenient() {
        let (transport, _inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());
        let (handler, _rx) = noop_handler(transport, table, None, HookRegistry::default());

        handler
            .clone()
            .dispatch_control_request(crate::types::ControlRequestFrame {
                request_id: "r1".to_string(),
                request: InboundControlPayload::HookCallback {
                    callback_id: "hook_missing".to_string(),
                    tool_use_id: Some("tu_1".to_string()),
                    input: json!({
                        "hook_event_name": "PreToolUse",
                        "session_id": "s",
                        "transcript_path": "/t",
                        "cwd": "/c",
                        "tool_name": "Bash",
                        "tool_input": {"command": "ls"}
                    }),
                },
            })
            .await;

        let response = outbound_rx.recv().await.unwrap();
        assert_eq!(response["response"]["response"]["continue"], true);
    }

    #[tokio::test]
    async fn test_hook_callback_round_trip_resolves_registered_handler() {
        let (transport, _inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());

        let observed_tool_use_id = Arc::new(std::sync::Mutex::new(None));
        let hooks = {
            let observed_tool_use_id = observed_tool_use_id.clone();
            Hooks::new().on(HookEvent::PreToolUse, Some("Bash"), move |input, ctx| {
                let observed_tool_use_id = observed_tool_use_id.clone();
                async move {
                    *observed_tool_use_id.lock().unwrap() = ctx.tool_use_id.clone();
                    match input {
                        crate::hooks::HookInput::PreToolUse(i) if i.tool_name == "Bash" => {
                            HookOutput::stop("policy")
                        }
                        _ => HookOutput::allow(),
                    }
                }
            })
        };
        let registry = HookRegistry::build(&hooks);

        let (handler, _rx) = noop_handler(transport, table, None, registry);

        handler
            .clone()
            .dispatch_control_request(crate::types::ControlRequestFrame {
                request_id: "r1".to_string(),
                request: InboundControlPayload::HookCallback {
                    callback_id: "hook_0".to_string(),
                    tool_use_id: Some("tu_X".to_string()),
                    input: json!({
                        "hook_event_name": "PreToolUse",
                        "session_id": "s",
                        "transcript_path": "/t",
                        "cwd": "/c",
                        "tool_name": "Bash",
                        "tool_input": {"command": "ls"}
                    }),
                },
            })
            .await;

        let response = outbound_rx.recv().await.unwrap();
        assert_eq!(response["response"]["request_id"], "r1");
        assert_eq!(response["response"]["response"]["continue"], false);
        assert_eq!(response["response"]["response"]["reason"], "policy");
        assert_eq!(
            *observed_tool_use_id.lock().unwrap(),
            Some("tu_X".to_string())
        );
    }

    #[tokio::test]
    async fn test_mcp_message_unregistered_server_errors() {
        let (transport, _inbound_tx, mut outbound_rx) = InMemoryTransport::pair();
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let table = Arc::new(CorrelationTable::new());
        let (handler, _rx) = noop_handler(transport, table, None, HookRegistry::default());

        handler
            .clone()
            .dispatch_control_request(crate::types::ControlRequestFrame {
                request_id: "r1".to_string(),
                request: InboundControlPayload::McpMessage {
                    server_name: "missing".to_string(),
                    message: json!({"ping": true}),
                },
            })
            .await;

        let response = outbound_rx.recv().await.unwrap();
        assert_eq!(response["response"]["subtype"], "error");
    }
}
