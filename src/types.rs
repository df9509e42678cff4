//! Core type definitions for the Claude Agent SDK.
//!
//! This module contains the wire-format data structures exchanged with the CLI subprocess,
//! plus the crate's public configuration surface. The type system is organized into three
//! main categories:
//!
//! # Conversation data model
//!
//! - [`Frame`]: the top-level tagged union every NDJSON line on stdout decodes into
//! - [`ContentBlock`]: text / thinking / tool-use / tool-result content inside a message
//! - [`ResultMessage`]: the message that terminates a turn
//!
//! # Control protocol wire types
//!
//! - [`ControlRequestPayload`]: the subtypes the host may send outbound
//! - [`InboundControlPayload`]: the subtypes the CLI may send inbound (`can_use_tool`,
//!   `hook_callback`, `mcp_message`)
//! - [`ControlResponsePayload`]: success/error envelope for a completed control request
//!
//! # Client configuration
//!
//! - [`ClientOptions`] / [`ClientOptionsBuilder`]: how a host configures a session
//! - [`PermissionMode`], [`PermissionResult`]: the tool-permission vocabulary

use crate::hooks::Hooks;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

// ============================================================================
// NEWTYPE WRAPPERS FOR COMPILE-TIME TYPE SAFETY
// ============================================================================

/// Validated request timeout, in seconds.
///
/// # Validation Rules
///
/// - Must be greater than zero.
///
/// # Example
///
/// ```
/// use claude_agent_sdk::RequestTimeout;
///
/// let timeout = RequestTimeout::new(300).unwrap();
/// assert_eq!(timeout.as_secs(), 300);
///
/// assert!(RequestTimeout::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTimeout(u64);

impl RequestTimeout {
    /// Creates a new `RequestTimeout` after validation.
    ///
    /// # Errors
    ///
    /// Returns an error if `secs` is zero.
    pub fn new(secs: u64) -> crate::Result<Self> {
        if secs == 0 {
            return Err(Error::invalid_input("timeout must be greater than zero"));
        }
        Ok(RequestTimeout(secs))
    }

    /// Returns the timeout in seconds.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        RequestTimeout(300)
    }
}

/// Validated working directory path for the spawned CLI subprocess.
///
/// # Validation Rules
///
/// - Must not be empty.
///
/// Existence of the path on disk is deliberately not checked here; file-system
/// discovery is an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkingDirectory(PathBuf);

impl WorkingDirectory {
    /// Creates a new `WorkingDirectory` after validation.
    pub fn new(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_input("working directory cannot be empty"));
        }
        Ok(WorkingDirectory(path))
    }

    /// Returns the path.
    pub fn as_path(&self) -> &std::path::Path {
        &self.0
    }
}

// ============================================================================
// PERMISSION MODE
// ============================================================================

/// Runtime permission mode, mutable via `set_permission_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Ask for permission per the CLI's normal policy.
    Default,
    /// Auto-accept file edits, still gate other tools.
    AcceptEdits,
    /// Plan-only mode; no mutating tool calls are allowed to execute.
    Plan,
    /// Bypass all permission checks.
    BypassPermissions,
}

/// The host's reply to a `can_use_tool` control request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "behavior", rename_all = "lowercase")]
pub enum PermissionResult {
    /// Allow the tool call to proceed, optionally with a modified input.
    Allow {
        #[serde(skip_serializing_if = "Option::is_none")]
        updated_input: Option<Value>,
    },
    /// Deny the tool call.
    Deny {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        interrupt: Option<bool>,
    },
    /// Defer the decision back to the host's interactive UI.
    Ask {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl PermissionResult {
    /// Convenience constructor for an unconditional allow.
    pub fn allow() -> Self {
        PermissionResult::Allow {
            updated_input: None,
        }
    }

    /// Convenience constructor for a deny with a reason.
    pub fn deny(message: impl Into<String>) -> Self {
        PermissionResult::Deny {
            message: message.into(),
            interrupt: None,
        }
    }
}

/// Suggested permission update the CLI offers alongside a `can_use_tool` request
/// (e.g. "always allow this tool for this session"). Kept opaque; the host
/// decides how to interpret and apply it.
pub type PermissionSuggestion = Value;

/// Async callback invoked by the control server for `can_use_tool` requests.
pub type PermissionCallback = Arc<
    dyn Fn(
            String,
            Value,
            Vec<PermissionSuggestion>,
            Option<String>,
        ) -> Pin<Box<dyn Future<Output = PermissionResult> + Send>>
        + Send
        + Sync,
>;

/// Async callback invoked by the control server for `mcp_message` requests
/// addressed to a particular `server_name`.
pub type McpHandler = Arc<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = crate::Result<Value>> + Send>> + Send + Sync,
>;

/// Fire-and-forget sink notified with every `ResultMessage` observed on the
/// conversation stream. Errors inside the sink are never surfaced.
pub type MetricsSink = Arc<dyn Fn(&ResultMessage) + Send + Sync>;

// ============================================================================
// CLIENT CONFIGURATION
// ============================================================================

/// Configuration for a [`crate::Client`] session.
///
/// `ClientOptions` controls how the CLI subprocess is launched and how the session
/// behaves: the permission mode, hooks, and the callbacks the control server
/// dispatches into. Construct with [`ClientOptions::builder()`].
#[derive(Clone)]
pub struct ClientOptions {
    /// Path (or bare command name resolved via `PATH`) to the agent CLI binary.
    cli_path: String,

    /// Extra arguments passed to the CLI subprocess. Provider-specific CLI
    /// argument construction is an external collaborator; this is passed
    /// through verbatim.
    cli_args: Vec<String>,

    /// Working directory for the spawned subprocess.
    working_dir: Option<WorkingDirectory>,

    /// System prompt sent as part of session initialization.
    system_prompt: Option<String>,

    /// Initial permission mode.
    permission_mode: Option<PermissionMode>,

    /// Initial model identifier.
    model: Option<String>,

    /// Initial thinking-token budget.
    max_thinking_tokens: Option<u32>,

    /// Timeout applied to each outbound control request.
    timeout: RequestTimeout,

    /// Lifecycle hook matchers, grouped by event kind.
    hooks: Hooks,

    /// Callback invoked for `can_use_tool` control requests.
    permission_callback: Option<PermissionCallback>,

    /// Handlers for `mcp_message` control requests, keyed by `server_name`.
    mcp_handlers: HashMap<String, McpHandler>,

    /// Optional fire-and-forget metrics sink.
    metrics_sink: Option<MetricsSink>,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("cli_path", &self.cli_path)
            .field("cli_args", &self.cli_args)
            .field("working_dir", &self.working_dir)
            .field("system_prompt", &self.system_prompt)
            .field("permission_mode", &self.permission_mode)
            .field("model", &self.model)
            .field("max_thinking_tokens", &self.max_thinking_tokens)
            .field("timeout", &self.timeout)
            .field("hooks", &self.hooks)
            .field(
                "permission_callback",
                &self.permission_callback.as_ref().map(|_| "<callback>"),
            )
            .field(
                "mcp_handlers",
                &format!("{} handlers", self.mcp_handlers.len()),
            )
            .field(
                "metrics_sink",
                &self.metrics_sink.as_ref().map(|_| "<sink>"),
            )
            .finish()
    }
}

impl ClientOptions {
    /// Start building a new `ClientOptions`.
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    pub fn cli_path(&self) -> &str {
        &self.cli_path
    }

    pub fn cli_args(&self) -> &[String] {
        &self.cli_args
    }

    pub fn working_dir(&self) -> Option<&WorkingDirectory> {
        self.working_dir.as_ref()
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn permission_mode(&self) -> Option<PermissionMode> {
        self.permission_mode
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn max_thinking_tokens(&self) -> Option<u32> {
        self.max_thinking_tokens
    }

    pub fn timeout(&self) -> RequestTimeout {
        self.timeout
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn permission_callback(&self) -> Option<&PermissionCallback> {
        self.permission_callback.as_ref()
    }

    pub fn mcp_handlers(&self) -> &HashMap<String, McpHandler> {
        &self.mcp_handlers
    }

    pub fn metrics_sink(&self) -> Option<&MetricsSink> {
        self.metrics_sink.as_ref()
    }
}

/// Builder for [`ClientOptions`].
#[derive(Default)]
pub struct ClientOptionsBuilder {
    cli_path: Option<String>,
    cli_args: Vec<String>,
    working_dir: Option<WorkingDirectory>,
    system_prompt: Option<String>,
    permission_mode: Option<PermissionMode>,
    model: Option<String>,
    max_thinking_tokens: Option<u32>,
    timeout: Option<u64>,
    hooks: Hooks,
    permission_callback: Option<PermissionCallback>,
    mcp_handlers: HashMap<String, McpHandler>,
    metrics_sink: Option<MetricsSink>,
}

impl std::fmt::Debug for ClientOptionsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptionsBuilder")
            .field("cli_path", &self.cli_path)
            .field("cli_args", &self.cli_args)
            .field("permission_mode", &self.permission_mode)
            .field("model", &self.model)
            .finish()
    }
}

impl ClientOptionsBuilder {
    /// Path or command name of the agent CLI binary. Required.
    pub fn cli_path(mut self, path: impl Into<String>) -> Self {
        self.cli_path = Some(path.into());
        self
    }

    /// Append a single CLI argument.
    pub fn cli_arg(mut self, arg: impl Into<String>) -> Self {
        self.cli_args.push(arg.into());
        self
    }

    /// Replace the full CLI argument list.
    pub fn cli_args(mut self, args: Vec<String>) -> Self {
        self.cli_args = args;
        self
    }

    /// Working directory for the spawned subprocess.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = WorkingDirectory::new(dir).ok();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_thinking_tokens(mut self, tokens: u32) -> Self {
        self.max_thinking_tokens = Some(tokens);
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn permission_callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(String, Value, Vec<PermissionSuggestion>, Option<String>) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = PermissionResult> + Send + 'static,
    {
        self.permission_callback = Some(Arc::new(move |name, input, suggestions, blocked| {
            Box::pin(callback(name, input, suggestions, blocked))
        }));
        self
    }

    pub fn mcp_handler<F, Fut>(mut self, server_name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<Value>> + Send + 'static,
    {
        self.mcp_handlers
            .insert(server_name.into(), Arc::new(move |msg| Box::pin(handler(msg))));
        self
    }

    pub fn metrics_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&ResultMessage) + Send + Sync + 'static,
    {
        self.metrics_sink = Some(Arc::new(sink));
        self
    }

    /// Build the final `ClientOptions`, validating required fields.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if `cli_path` was never set or is empty, or if
    /// `timeout` was explicitly set to zero.
    pub fn build(self) -> crate::Result<ClientOptions> {
        let cli_path = self
            .cli_path
            .ok_or_else(|| Error::config("cli_path is required"))?;

        if cli_path.trim().is_empty() {
            return Err(Error::config("cli_path cannot be empty"));
        }

        let timeout = match self.timeout {
            Some(secs) => RequestTimeout::new(secs)?,
            None => RequestTimeout::default(),
        };

        Ok(ClientOptions {
            cli_path,
            cli_args: self.cli_args,
            working_dir: self.working_dir,
            system_prompt: self.system_prompt,
            permission_mode: self.permission_mode,
            model: self.model,
            max_thinking_tokens: self.max_thinking_tokens,
            timeout,
            hooks: self.hooks,
            permission_callback: self.permission_callback,
            mcp_handlers: self.mcp_handlers,
            metrics_sink: self.metrics_sink,
        })
    }
}

// ============================================================================
// CONTENT BLOCKS
// ============================================================================

/// A single unit of content inside an assistant message or a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    Thinking(ThinkingBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

/// Plain text content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Extended-thinking content. Present only when the CLI is configured to
/// stream its reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub thinking: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ThinkingBlock {
    pub fn new(thinking: impl Into<String>) -> Self {
        Self {
            thinking: thinking.into(),
            signature: None,
        }
    }
}

/// A request from the model to invoke a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolUseBlock {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// The result of executing a tool, sent back to the CLI as part of the next
/// `user` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResultBlock {
    pub fn new(tool_use_id: impl Into<String>, content: Value) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content,
            is_error: None,
        }
    }

    pub fn error(tool_use_id: impl Into<String>, content: Value) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content,
            is_error: Some(true),
        }
    }
}

// ============================================================================
// CONVERSATION FRAMES
// ============================================================================

/// Content of a `user` frame: either a plain string prompt, or a set of
/// content blocks (used when echoing tool results back to the CLI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Inner `message` object of a `user` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessageBody {
    pub role: String,
    pub content: UserContent,
}

/// `type: "user"` conversation frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessage {
    pub message: UserMessageBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl UserMessage {
    /// Build a plain-text user frame.
    pub fn text(prompt: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            message: UserMessageBody {
                role: "user".to_string(),
                content: UserContent::Text(prompt.into()),
            },
            parent_tool_use_id: None,
            session_id,
        }
    }

    /// Build a content-block user frame (used to return tool results).
    pub fn with_blocks(blocks: Vec<ContentBlock>, session_id: Option<String>) -> Self {
        Self {
            message: UserMessageBody {
                role: "user".to_string(),
                content: UserContent::Blocks(blocks),
            },
            parent_tool_use_id: None,
            session_id,
        }
    }
}

/// `type: "assistant"` conversation frame.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// `type: "system"` conversation frame. The payload shape varies by
/// `subtype` (e.g. `init`); unrecognised fields are preserved opaquely.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemMessage {
    pub subtype: String,
    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

/// `type: "result"` conversation frame. Terminates a turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultMessage {
    pub duration_ms: u64,
    pub is_error: bool,
    pub num_turns: u32,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `type: "stream_event"` conversation frame: raw streaming deltas, kept
/// opaque; host code that needs these decodes `event` itself.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEventMessage {
    pub event: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A single NDJSON line from the CLI, classified by its `type` discriminator.
///
/// Control frames (`control_request`/`control_response`) are consumed
/// internally by the handler; host code only ever observes the five
/// conversation variants via [`crate::Client::receive`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    User(UserMessage),
    Assistant(AssistantMessage),
    System(SystemMessage),
    Result(ResultMessage),
    StreamEvent(StreamEventMessage),
    ControlRequest(ControlRequestFrame),
    ControlResponse(ControlResponseFrame),
    /// A `type` value this crate doesn't recognise. Never fatal.
    #[serde(other)]
    Unknown,
}

/// A conversation message handed to host code by [`crate::Client::receive`].
#[derive(Debug, Clone)]
pub enum ConversationMessage {
    User(UserMessage),
    Assistant(AssistantMessage),
    System(SystemMessage),
    Result(ResultMessage),
    StreamEvent(StreamEventMessage),
}

// ============================================================================
// CONTROL PROTOCOL — INBOUND (CLI-INITIATED)
// ============================================================================

/// The `request` object of a CLI-initiated `control_request` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum InboundControlPayload {
    CanUseTool {
        tool_name: String,
        input: Value,
        #[serde(default)]
        permission_suggestions: Option<Vec<Value>>,
        #[serde(default)]
        blocked_path: Option<String>,
    },
    HookCallback {
        callback_id: String,
        #[serde(default)]
        tool_use_id: Option<String>,
        input: Value,
    },
    McpMessage {
        server_name: String,
        message: Value,
    },
    /// Any subtype the core doesn't special-case; answered with an error
    /// response citing the unknown subtype.
    #[serde(other)]
    Unknown,
}

/// A CLI-initiated `control_request` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlRequestFrame {
    pub request_id: String,
    pub request: InboundControlPayload,
}

// ============================================================================
// CONTROL PROTOCOL — OUTBOUND (HOST-INITIATED)
// ============================================================================

/// The `request` object of a host-initiated `control_request` frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlRequestPayload {
    Initialize {
        #[serde(skip_serializing_if = "Option::is_none")]
        hooks: Option<Value>,
    },
    Interrupt,
    SetPermissionMode {
        mode: PermissionMode,
    },
    SetModel {
        model: String,
    },
    SetMaxThinkingTokens {
        max_thinking_tokens: u32,
    },
    RewindFiles {
        user_message_id: String,
    },
    SupportedCommands,
    SupportedModels,
    McpServerStatus,
    AccountInfo,
}

// ============================================================================
// CONTROL PROTOCOL — RESPONSE ENVELOPE
// ============================================================================

/// The `response` object of a `control_response` frame (either direction).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlResponsePayload {
    Success {
        request_id: String,
        #[serde(default)]
        response: Option<Value>,
    },
    Error {
        request_id: String,
        error: String,
    },
}

impl ControlResponsePayload {
    pub fn request_id(&self) -> &str {
        match self {
            ControlResponsePayload::Success { request_id, .. } => request_id,
            ControlResponsePayload::Error { request_id, .. } => request_id,
        }
    }
}

/// An inbound `control_response` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlResponseFrame {
    pub response: ControlResponsePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_rejects_zero() {
        assert!(RequestTimeout::new(0).is_err());
        assert!(RequestTimeout::new(1).is_ok());
    }

    #[test]
    fn test_permission_mode_wire_strings() {
        assert_eq!(
            serde_json::to_value(PermissionMode::Default).unwrap(),
            serde_json::json!("default")
        );
        assert_eq!(
            serde_json::to_value(PermissionMode::AcceptEdits).unwrap(),
            serde_json::json!("acceptEdits")
        );
        assert_eq!(
            serde_json::to_value(PermissionMode::Plan).unwrap(),
            serde_json::json!("plan")
        );
        assert_eq!(
            serde_json::to_value(PermissionMode::BypassPermissions).unwrap(),
            serde_json::json!("bypassPermissions")
        );
    }

    #[test]
    fn test_client_options_requires_cli_path() {
        let err = ClientOptions::builder().build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_client_options_build_succeeds() {
        let options = ClientOptions::builder()
            .cli_path("claude")
            .system_prompt("You are a helpful assistant")
            .timeout(60)
            .build()
            .unwrap();

        assert_eq!(options.cli_path(), "claude");
        assert_eq!(options.timeout().as_secs(), 60);
    }

    #[test]
    fn test_frame_unknown_type_is_tolerated() {
        let raw = serde_json::json!({"type": "some_future_type", "foo": "bar"});
        let frame: Frame = serde_json::from_value(raw).unwrap();
        assert!(matches!(frame, Frame::Unknown));
    }

    #[test]
    fn test_frame_parses_result_message() {
        let raw = serde_json::json!({
            "type": "result",
            "duration_ms": 1200,
            "is_error": false,
            "num_turns": 3,
            "session_id": "sess-1",
            "total_cost_usd": 0.01
        });
        let frame: Frame = serde_json::from_value(raw).unwrap();
        match frame {
            Frame::Result(result) => {
                assert_eq!(result.duration_ms, 1200);
                assert!(!result.is_error);
                assert_eq!(result.num_turns, 3);
                assert_eq!(result.session_id, "sess-1");
                assert_eq!(result.total_cost_usd, Some(0.01));
            }
            other => panic!("expected Result frame, got {other:?}"),
        }
    }

    #[test]
    fn test_inbound_control_request_parses_can_use_tool() {
        let raw = serde_json::json!({
            "type": "control_request",
            "request_id": "r1",
            "request": {
                "subtype": "can_use_tool",
                "tool_name": "Bash",
                "input": {"command": "ls"}
            }
        });
        let frame: Frame = serde_json::from_value(raw).unwrap();
        match frame {
            Frame::ControlRequest(req) => {
                assert_eq!(req.request_id, "r1");
                match req.request {
                    InboundControlPayload::CanUseTool { tool_name, .. } => {
                        assert_eq!(tool_name, "Bash");
                    }
                    other => panic!("expected CanUseTool, got {other:?}"),
                }
            }
            other => panic!("expected ControlRequest frame, got {other:?}"),
        }
    }

    #[test]
    fn test_control_response_success_round_trip() {
        let raw = serde_json::json!({
            "type": "control_response",
            "response": {
                "subtype": "success",
                "request_id": "req_0_ab12cd34",
                "response": {"ok": true}
            }
        });
        let frame: Frame = serde_json::from_value(raw).unwrap();
        match frame {
            Frame::ControlResponse(resp) => {
                assert_eq!(resp.response.request_id(), "req_0_ab12cd34");
            }
            other => panic!("expected ControlResponse frame, got {other:?}"),
        }
    }
}
