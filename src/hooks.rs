//! Lifecycle hooks for intercepting and observing agent execution.
//!
//! Hooks let host code observe (and sometimes veto) what the CLI is doing at twelve
//! named points in a session's lifecycle — before and after a tool runs, when a
//! prompt is submitted, when a session starts or ends, and so on. A host registers
//! closures against a [`HookEvent`] with an optional matcher pattern (e.g. a tool
//! name), and the [`HookRegistry`] assigns each one a stable callback id that is
//! advertised to the CLI during session initialization.
//!
//! # Example
//!
//! ```rust,no_run
//! use claude_agent_sdk::{Hooks, HookEvent, HookInput, HookOutput};
//!
//! let hooks = Hooks::new().on(HookEvent::PreToolUse, Some("Bash"), |input, _ctx| async move {
//!     let is_dangerous = matches!(&input, HookInput::PreToolUse(i) if i.tool_input["command"] == "rm -rf /");
//!     if is_dangerous {
//!         return HookOutput::block("dangerous command blocked");
//!     }
//!     HookOutput::allow()
//! });
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// HOOK EVENT
// ============================================================================

/// The twelve points in a session's lifecycle a hook can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    PostToolUseFailure,
    Notification,
    UserPromptSubmit,
    SessionStart,
    SessionEnd,
    Stop,
    SubagentStart,
    SubagentStop,
    PreCompact,
    PermissionRequest,
}

impl HookEvent {
    /// All twelve variants, in registration order. Used when building the
    /// `hooks` payload of the `initialize` control request.
    pub const ALL: [HookEvent; 12] = [
        HookEvent::PreToolUse,
        HookEvent::PostToolUse,
        HookEvent::PostToolUseFailure,
        HookEvent::Notification,
        HookEvent::UserPromptSubmit,
        HookEvent::SessionStart,
        HookEvent::SessionEnd,
        HookEvent::Stop,
        HookEvent::SubagentStart,
        HookEvent::SubagentStop,
        HookEvent::PreCompact,
        HookEvent::PermissionRequest,
    ];

    /// The wire name used in `hook_event_name` and in the `initialize` payload.
    pub fn wire_name(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::PostToolUseFailure => "PostToolUseFailure",
            HookEvent::Notification => "Notification",
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::SessionStart => "SessionStart",
            HookEvent::SessionEnd => "SessionEnd",
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStart => "SubagentStart",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::PermissionRequest => "PermissionRequest",
        }
    }
}

// ============================================================================
// HOOK INPUT
// ============================================================================

/// Fields common to every hook input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseHookInput {
    pub session_id: String,
    pub transcript_path: String,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreToolUseHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub tool_name: String,
    pub tool_input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUseHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_response: Value,
    pub tool_use_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUseFailureHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_use_id: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_interrupt: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptSubmitHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStartSource {
    Startup,
    Resume,
    Clear,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub source: SessionStartSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    Clear,
    Logout,
    PromptInputExit,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub reason: SessionEndReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub stop_hook_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentStartHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub agent_id: String,
    pub agent_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentStopHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub stop_hook_active: bool,
    pub agent_id: String,
    pub agent_transcript_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactTrigger {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCompactHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub trigger: CompactTrigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequestHookInput {
    #[serde(flatten)]
    pub base: BaseHookInput,
    pub tool_name: String,
    pub tool_input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_suggestions: Option<Vec<Value>>,
}

/// The `input` payload of a `hook_callback` control request, tagged by
/// `hook_event_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    PreToolUse(PreToolUseHookInput),
    PostToolUse(PostToolUseHookInput),
    PostToolUseFailure(PostToolUseFailureHookInput),
    Notification(NotificationHookInput),
    UserPromptSubmit(UserPromptSubmitHookInput),
    SessionStart(SessionStartHookInput),
    SessionEnd(SessionEndHookInput),
    Stop(StopHookInput),
    SubagentStart(SubagentStartHookInput),
    SubagentStop(SubagentStopHookInput),
    PreCompact(PreCompactHookInput),
    PermissionRequest(PermissionRequestHookInput),
}

impl HookInput {
    /// The event kind this input was raised for.
    pub fn event(&self) -> HookEvent {
        match self {
            HookInput::PreToolUse(_) => HookEvent::PreToolUse,
            HookInput::PostToolUse(_) => HookEvent::PostToolUse,
            HookInput::PostToolUseFailure(_) => HookEvent::PostToolUseFailure,
            HookInput::Notification(_) => HookEvent::Notification,
            HookInput::UserPromptSubmit(_) => HookEvent::UserPromptSubmit,
            HookInput::SessionStart(_) => HookEvent::SessionStart,
            HookInput::SessionEnd(_) => HookEvent::SessionEnd,
            HookInput::Stop(_) => HookEvent::Stop,
            HookInput::SubagentStart(_) => HookEvent::SubagentStart,
            HookInput::SubagentStop(_) => HookEvent::SubagentStop,
            HookInput::PreCompact(_) => HookEvent::PreCompact,
            HookInput::PermissionRequest(_) => HookEvent::PermissionRequest,
        }
    }

    /// The tool name this input concerns, if any (`PreToolUse`/`PostToolUse`/
    /// `PostToolUseFailure`/`PermissionRequest` only). Used to evaluate a
    /// matcher's pattern.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            HookInput::PreToolUse(i) => Some(&i.tool_name),
            HookInput::PostToolUse(i) => Some(&i.tool_name),
            HookInput::PostToolUseFailure(i) => Some(&i.tool_name),
            HookInput::PermissionRequest(i) => Some(&i.tool_name),
            _ => None,
        }
    }
}

// ============================================================================
// HOOK OUTPUT
// ============================================================================

/// Decision a hook returns to block the action under inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookDecision {
    Block,
}

/// Wire-format reply to a `hook_callback` control request.
///
/// `r#async`/`async_timeout` resolve the deferred-reply case: a hook may return
/// immediately with `async: true` and deliver its real decision later out of
/// band, observed as camelCase on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookOutput {
    #[serde(skip_serializing_if = "Option::is_none", rename = "continue")]
    pub continue_: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<HookDecision>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "stopReason")]
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemMessage")]
    pub system_message: Option<String>,
    /// Free-form explanation attached to the decision (e.g. why a non-blocking
    /// error was converted into a lenient `continue:true`). Distinct from
    /// `system_message`, which the CLI surfaces to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "suppressOutput")]
    pub suppress_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "hookSpecificOutput")]
    pub hook_specific_output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "async")]
    pub r#async: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "asyncTimeout")]
    pub async_timeout: Option<u64>,
}

impl HookOutput {
    /// Let the action proceed unmodified.
    pub fn allow() -> Self {
        Self::default()
    }

    /// Block the action, surfacing `reason` as the system message.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some(HookDecision::Block),
            system_message: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Refuse to let the turn continue (`continue: false`) with an explicit
    /// `reason` attached.
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            continue_: Some(false),
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Attach hook-specific output (e.g. a modified tool input for
    /// `PreToolUse`).
    pub fn with_hook_specific_output(mut self, value: Value) -> Self {
        self.hook_specific_output = Some(value);
        self
    }
}

// ============================================================================
// HOOK CONTEXT
// ============================================================================

/// Context passed alongside a [`HookInput`] to every handler invocation.
///
/// `tool_use_id` carries the id from the enclosing `hook_callback` request —
/// the only place it's available, since several `HookInput` kinds (notably
/// `PreToolUse`) don't carry one themselves.
#[derive(Clone, Default)]
pub struct HookContext {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub tool_use_id: Option<String>,
    pub cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("session_id", &self.session_id)
            .field("cwd", &self.cwd)
            .field("tool_use_id", &self.tool_use_id)
            .field(
                "cancellation_token",
                &self.cancellation_token.as_ref().map(|_| "<token>"),
            )
            .finish()
    }
}

impl HookContext {
    pub fn new(
        session_id: Option<String>,
        cwd: Option<String>,
        tool_use_id: Option<String>,
        cancellation_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            session_id,
            cwd,
            tool_use_id,
            cancellation_token,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

// ============================================================================
// HOOKS REGISTRY
// ============================================================================

/// Async handler invoked with a [`HookInput`] and its [`HookContext`].
pub type HookHandler = Arc<
    dyn Fn(HookInput, HookContext) -> Pin<Box<dyn Future<Output = HookOutput> + Send>>
        + Send
        + Sync,
>;

/// One registered matcher: a pattern, every callback registered against it,
/// and the timeout applied to each of those callbacks.
///
/// A matcher may carry more than one callback: one `PreToolUse` matcher with
/// two callbacks advertises a single descriptor whose `hookCallbackIds` lists
/// both. Registering against the same `(event, matcher)` pair twice via
/// [`Hooks::on`] appends to the existing group rather than creating a second
/// one.
#[derive(Clone)]
pub struct HookMatcher {
    /// Pattern evaluated against [`HookInput::tool_name`] (e.g. `"Bash"` or
    /// `"Write|Edit"`). `None` matches every input for the event.
    pub matcher: Option<String>,
    pub handlers: Vec<HookHandler>,
    /// Default 60 seconds, matching the CLI's own hook timeout. Applies to
    /// every callback in this group.
    pub timeout: Duration,
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("handlers", &format!("[{} callbacks]", self.handlers.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HookMatcher {
    /// Whether this matcher applies to `input`, given its (possibly absent)
    /// tool name.
    ///
    /// This is a host-side convenience for tests and local simulation — the
    /// CLI is the authority on matcher evaluation once the descriptor crosses
    /// the wire, and this method's pipe-separated alternation is a deliberate
    /// subset of the CLI's regex-capable matcher strings.
    pub fn applies_to(&self, input: &HookInput) -> bool {
        match (&self.matcher, input.tool_name()) {
            (None, _) => true,
            (Some(pattern), Some(name)) => pattern.split('|').any(|candidate| candidate == name),
            (Some(_), None) => false,
        }
    }
}

/// Fluent container of hook registrations, grouped by [`HookEvent`].
///
/// Built with [`Hooks::new`] and [`Hooks::on`], then handed to
/// [`crate::ClientOptionsBuilder::hooks`]. A [`HookRegistry`] is derived from
/// this at session start to assign wire-visible callback ids.
#[derive(Clone, Default)]
pub struct Hooks {
    matchers: HashMap<HookEvent, Vec<HookMatcher>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(String, usize)> = self
            .matchers
            .iter()
            .map(|(event, matchers)| (event.wire_name().to_string(), matchers.len()))
            .collect();
        counts.sort();
        f.debug_struct("Hooks").field("matchers", &counts).finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event`, optionally scoped to tools matching
    /// `matcher` (e.g. `"Bash"`), with the default 60-second timeout.
    pub fn on<F, Fut>(self, event: HookEvent, matcher: Option<&str>, handler: F) -> Self
    where
        F: Fn(HookInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookOutput> + Send + 'static,
    {
        self.on_with_timeout(event, matcher, Duration::from_secs(60), handler)
    }

    /// Like [`Hooks::on`], with an explicit per-invocation timeout.
    ///
    /// If a matcher already registered under `(event, matcher)` exists, the
    /// new callback is appended to it (and `timeout` is ignored in favour of
    /// the group's existing timeout) rather than creating a second group.
    pub fn on_with_timeout<F, Fut>(
        mut self,
        event: HookEvent,
        matcher: Option<&str>,
        timeout: Duration,
        handler: F,
    ) -> Self
    where
        F: Fn(HookInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookOutput> + Send + 'static,
    {
        let handler: HookHandler = Arc::new(move |input, ctx| Box::pin(handler(input, ctx)));
        let group = self.matchers.entry(event).or_default();
        match group.iter_mut().find(|m| m.matcher.as_deref() == matcher) {
            Some(existing) => existing.handlers.push(handler),
            None => group.push(HookMatcher {
                matcher: matcher.map(str::to_string),
                handlers: vec![handler],
                timeout,
            }),
        }
        self
    }

    /// Matchers registered for `event`, in registration order.
    pub fn matchers_for(&self, event: HookEvent) -> &[HookMatcher] {
        self.matchers.get(&event).map_or(&[], Vec::as_slice)
    }

    /// Every event with at least one registered matcher.
    pub fn registered_events(&self) -> impl Iterator<Item = HookEvent> + '_ {
        self.matchers.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.values().all(Vec::is_empty)
    }
}

/// A single callback resolved by [`HookRegistry::get`]: the handler itself
/// plus the timeout its matcher group was registered with.
#[derive(Clone)]
pub struct RegisteredHook {
    pub handler: HookHandler,
    pub timeout: Duration,
}

/// Resolves wire-visible `callback_id` strings to registered handlers.
///
/// Built once at session start from the [`Hooks`] the host configured; the
/// `initialize` control request advertises one descriptor per
/// `(event, matcher)` group carrying every callback id assigned to it, and
/// inbound `hook_callback` requests carry a single id back for lookup.
#[derive(Clone, Default)]
pub struct HookRegistry {
    by_id: HashMap<String, RegisteredHook>,
    descriptors: Vec<(HookEvent, Option<String>, Vec<String>, Duration)>,
}

impl HookRegistry {
    /// Assign a stable `hook_<N>` id to every callback in `hooks`, in a fixed
    /// event order so ids are deterministic across runs with the same
    /// configuration. Callbacks sharing a matcher group are assigned
    /// consecutive ids and advertised together in one descriptor.
    pub fn build(hooks: &Hooks) -> Self {
        let mut registry = HookRegistry::default();
        let mut counter = 0usize;

        for event in HookEvent::ALL {
            for matcher in hooks.matchers_for(event) {
                let mut ids = Vec::with_capacity(matcher.handlers.len());
                for handler in &matcher.handlers {
                    let callback_id = format!("hook_{counter}");
                    counter += 1;
                    registry.by_id.insert(
                        callback_id.clone(),
                        RegisteredHook {
                            handler: handler.clone(),
                            timeout: matcher.timeout,
                        },
                    );
                    ids.push(callback_id);
                }
                registry
                    .descriptors
                    .push((event, matcher.matcher.clone(), ids, matcher.timeout));
            }
        }

        registry
    }

    /// Look up the callback registered under `callback_id`.
    pub fn get(&self, callback_id: &str) -> Option<&RegisteredHook> {
        self.by_id.get(callback_id)
    }

    /// The `hooks` field of the outbound `initialize` control request: one
    /// JSON object per event carrying its matcher/callback-id groups.
    pub fn to_wire_value(&self) -> Value {
        let mut by_event: HashMap<&'static str, Vec<Value>> = HashMap::new();
        for (event, matcher, ids, timeout) in &self.descriptors {
            by_event.entry(event.wire_name()).or_default().push(
                serde_json::json!({
                    "matcher": matcher,
                    "hookCallbackIds": ids,
                    "timeout": timeout.as_secs_f64(),
                }),
            );
        }
        serde_json::to_value(by_event).unwrap_or(Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
