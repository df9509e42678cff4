//! Hooks Example
//!
//! Demonstrates registering hooks to observe and gate agent behavior at
//! lifecycle points:
//! - PreToolUse: veto a `Bash` call before it runs
//! - PostToolUse: log the result after a tool call completes
//! - UserPromptSubmit: record every prompt the host sends
//!
//! Requires the `claude` CLI to be available on `PATH`.

use claude_agent_sdk::{Client, ClientOptions, HookEvent, HookOutput, Hooks};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("HOOKS EXAMPLE");
    println!("{}", "=".repeat(70));

    let hooks = Hooks::new()
        .on(HookEvent::PreToolUse, Some("Bash"), |input, _ctx| async move {
            if let Some(name) = input.tool_name() {
                println!("🔎 PreToolUse hook: inspecting `{name}` call");
            }
            HookOutput::block("Bash calls are disabled in this demo")
        })
        .on(HookEvent::PostToolUse, None, |input, _ctx| async move {
            if let Some(name) = input.tool_name() {
                println!("✓ PostToolUse hook: `{name}` finished");
            }
            HookOutput::allow()
        })
        .on(HookEvent::UserPromptSubmit, None, |_input, _ctx| async {
            println!("📝 UserPromptSubmit hook: prompt recorded");
            HookOutput::allow()
        });

    let options = ClientOptions::builder()
        .cli_path("claude")
        .system_prompt("You are a helpful assistant")
        .hooks(hooks)
        .build()?;

    let client = Client::new(options);
    client.start().await?;
    client.initialize().await?;

    println!("\nSending a prompt that should trigger the Bash gate...\n");
    client.send("List the files in the current directory").await?;

    for message in client.receive_turn().await? {
        println!("{message:?}");
    }

    client.dispose().await?;

    println!();
    println!("{}", "=".repeat(70));
    println!("Hooks example complete!");
    println!("{}", "=".repeat(70));

    Ok(())
}
