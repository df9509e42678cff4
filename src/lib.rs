//! A Rust SDK for driving the Claude Code agent CLI as a subprocess.
//!
//! The host spawns the CLI, exchanges newline-delimited JSON frames over its
//! stdin/stdout, and gets back a structured, stream-oriented conversation
//! together with a bidirectional **control protocol**: the host can
//! initialize the session, mutate runtime state (permission mode, model,
//! thinking-token budget), interrupt or rewind, and the CLI can in turn ask
//! the host whether a tool use is permitted or invoke a registered hook.
//!
//! ## Architecture
//!
//! - **transport**: the byte-stream boundary with the CLI — the NDJSON frame
//!   codec and the `Transport` trait, with a default `SubprocessTransport`
//!   and an `InMemoryTransport` test double.
//! - **control**: outbound control requests — request-id generation, the
//!   correlation table, and `ControlClient`.
//! - **handler**: the background reader task that classifies inbound frames
//!   and dispatches CLI-initiated `can_use_tool`/`hook_callback`/`mcp_message`
//!   requests back to host-registered handlers.
//! - **hooks**: the twelve-event hook system — typed `HookInput`/`HookOutput`,
//!   the `Hooks` builder, and `HookRegistry` callback-id bookkeeping.
//! - **types**: the wire data model (conversation messages, content blocks,
//!   control frames) and `ClientOptions`, the crate's configuration surface.
//! - **client**: `Client`, the public session facade, and its
//!   `Created -> Started -> Initialized -> Disposed` lifecycle.
//! - **error**: the crate-wide `Error` taxonomy and `Result` alias.
//!
//! ## Example
//!
//! ```no_run
//! use claude_agent_sdk::{Client, ClientOptions, ConversationMessage};
//!
//! # async fn run() -> claude_agent_sdk::Result<()> {
//! let options = ClientOptions::builder()
//!     .cli_path("claude")
//!     .build()?;
//!
//! let client = Client::new(options);
//! client.start().await?;
//! client.initialize().await?;
//!
//! client.send("What files are in this directory?").await?;
//! for message in client.receive_turn().await? {
//!     if let ConversationMessage::Assistant(assistant) = message {
//!         println!("{assistant:?}");
//!     }
//! }
//!
//! client.dispose().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Most applications only need the [`prelude`].

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Session facade and lifecycle coordinator: `Client` and `SessionState`.
mod client;

/// Outbound control client and the request/response correlation table.
mod control;

/// Error types and conversions used across all public APIs.
mod error;

/// Background reader task and inbound control-request dispatch:
/// `can_use_tool`, `hook_callback`, `mcp_message`.
mod handler;

/// Twelve-event hook system: typed inputs/outputs, the `Hooks` builder, and
/// `HookRegistry` callback-id bookkeeping.
mod hooks;

/// The byte-stream boundary with the CLI subprocess: the NDJSON frame codec
/// and the `Transport` trait.
mod transport;

/// Wire data model (conversation messages, content blocks, control frames)
/// and `ClientOptions`, the crate's configuration surface.
mod types;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

pub use client::{Client, SessionState};
pub use control::{ControlClient, CorrelationTable, RequestIdGenerator};
pub use error::{Error, Result};
pub use hooks::{
    BaseHookInput, CompactTrigger, HookContext, HookDecision, HookEvent, HookHandler, HookInput,
    HookMatcher, HookOutput, HookRegistry, Hooks, NotificationHookInput,
    PermissionRequestHookInput, PostToolUseFailureHookInput, PostToolUseHookInput,
    PreCompactHookInput, PreToolUseHookInput, RegisteredHook, SessionEndHookInput,
    SessionEndReason, SessionStartHookInput, SessionStartSource, StopHookInput,
    SubagentStartHookInput, SubagentStopHookInput, UserPromptSubmitHookInput,
};
pub use transport::{InMemoryTransport, SubprocessTransport, Transport};
pub use types::{
    AssistantMessage, ClientOptions, ClientOptionsBuilder, ContentBlock, ControlRequestPayload,
    ControlResponsePayload, ConversationMessage, Frame, McpHandler, MetricsSink,
    PermissionCallback, PermissionMode,
    PermissionResult, PermissionSuggestion, RequestTimeout, ResultMessage, StreamEventMessage,
    SystemMessage, TextBlock, ThinkingBlock, ToolResultBlock, ToolUseBlock, UserContent,
    UserMessage, UserMessageBody, WorkingDirectory,
};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// The small set of names most host applications need.
///
/// ```
/// use claude_agent_sdk::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::error::{Error, Result};
    pub use crate::hooks::{HookEvent, HookInput, HookOutput, Hooks};
    pub use crate::types::{
        ClientOptions, ClientOptionsBuilder, ContentBlock, ConversationMessage, PermissionMode,
        PermissionResult, TextBlock, ToolResultBlock, ToolUseBlock,
    };
}
