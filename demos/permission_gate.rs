//! Permission Gate Demo
//!
//! Demonstrates registering a `permission_callback` to answer `can_use_tool`
//! requests from the CLI: allow read-only tools, deny anything that looks
//! destructive, and defer everything else back to the host's own UI.
//!
//! Requires the `claude` CLI to be available on `PATH`.

use claude_agent_sdk::{Client, ClientOptions, PermissionResult};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(60));
    println!("PERMISSION GATE DEMO");
    println!("{}", "=".repeat(60));

    let options = ClientOptions::builder()
        .cli_path("claude")
        .system_prompt("You are a helpful assistant")
        .permission_callback(|tool_name, input, _suggestions, _blocked_path| async move {
            match tool_name.as_str() {
                "Read" | "Grep" | "Glob" => {
                    println!("✓ allowing read-only tool `{tool_name}`");
                    PermissionResult::allow()
                }
                "Bash" => {
                    let command = input
                        .get("command")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default();
                    if command.contains("rm ") {
                        println!("✗ denying destructive command: {command}");
                        PermissionResult::deny("destructive shell commands are not allowed")
                    } else {
                        println!("✓ allowing command: {command}");
                        PermissionResult::allow()
                    }
                }
                other => {
                    println!("? deferring `{other}` to the host's own UI");
                    PermissionResult::Ask { message: None }
                }
            }
        })
        .build()?;

    let client = Client::new(options);
    client.start().await?;
    client.initialize().await?;

    client
        .send("List the files here, then remove any temp files you find")
        .await?;

    for message in client.receive_turn().await? {
        println!("{message:?}");
    }

    client.dispose().await?;
    Ok(())
}
