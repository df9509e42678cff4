//! Simple query example
//!
//! Demonstrates basic usage of `Client` for a single-turn conversation.
//!
//! Requires the `claude` CLI to be available on `PATH`.

use claude_agent_sdk::{Client, ClientOptions, ContentBlock, ConversationMessage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = ClientOptions::builder()
        .cli_path("claude")
        .system_prompt("You are a helpful assistant")
        .build()?;

    let client = Client::new(options);
    client.start().await?;
    client.initialize().await?;

    println!("Sending query to the agent...\n");
    client
        .send("What's the capital of France? Please be brief.")
        .await?;

    print!("Response: ");
    for message in client.receive_turn().await? {
        match message {
            ConversationMessage::Assistant(assistant) => {
                for block in assistant.content {
                    match block {
                        ContentBlock::Text(text) => {
                            print!("{}", text.text);
                            std::io::Write::flush(&mut std::io::stdout())?;
                        }
                        ContentBlock::ToolUse(tool) => {
                            println!("\nTool called: {} (id: {})", tool.name, tool.id);
                            println!("Arguments: {}", tool.input);
                        }
                        ContentBlock::ToolResult(_) | ContentBlock::Thinking(_) => {}
                    }
                }
            }
            ConversationMessage::Result(result) => {
                println!(
                    "\n\nQuery complete! ({} turns, {} ms)",
                    result.num_turns, result.duration_ms
                );
            }
            _ => {}
        }
    }

    client.dispose().await?;
    Ok(())
}
