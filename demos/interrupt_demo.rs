//! Interrupt Capability Demo
//!
//! Demonstrates cancelling a long-running turn with `Client::interrupt`:
//!
//! 1. Timeout-based interruption — stop waiting after a deadline and
//!    interrupt the CLI's current turn.
//! 2. Conditional interruption — stop as soon as a streamed message matches
//!    some condition.
//!
//! Requires the `claude` CLI to be available on `PATH`.

use claude_agent_sdk::{Client, ClientOptions, ConversationMessage};
use std::time::Duration;
use tokio::time::timeout;

async fn timeout_example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(60));
    println!("Example 1: Timeout-based Interruption");
    println!("{}", "=".repeat(60));

    client
        .send("Write a very detailed essay about quantum computing")
        .await?;

    println!("Waiting up to 3 seconds for the first message...\n");

    match timeout(Duration::from_secs(3), client.receive()).await {
        Ok(Ok(Some(message))) => println!("Received before timeout: {message:?}"),
        Ok(Ok(None)) => println!("Turn ended before the timeout elapsed"),
        Ok(Err(err)) => println!("Receive failed: {err}"),
        Err(_) => {
            client.interrupt().await?;
            println!("⚠️  Timed out waiting for a response — interrupted the turn");
        }
    }

    Ok(())
}

async fn conditional_example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(60));
    println!("Example 2: Conditional Interruption");
    println!("{}", "=".repeat(60));

    client.send("Tell me about machine learning").await?;

    let mut seen = 0;
    while let Some(message) = client.receive().await? {
        seen += 1;
        if matches!(message, ConversationMessage::Assistant(_)) && seen >= 3 {
            client.interrupt().await?;
            println!("⚠️  Saw enough assistant output — interrupting");
            break;
        }
        if matches!(message, ConversationMessage::Result(_)) {
            break;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(60));
    println!("INTERRUPT CAPABILITY DEMO");
    println!("{}", "=".repeat(60));
    println!();

    let options = ClientOptions::builder()
        .cli_path("claude")
        .system_prompt("You are a helpful assistant. Be verbose.")
        .build()?;

    let client = Client::new(options);
    client.start().await?;
    client.initialize().await?;

    if let Err(err) = timeout_example(&client).await {
        eprintln!("Timeout example error: {err}");
    }
    if let Err(err) = conditional_example(&client).await {
        eprintln!("Conditional example error: {err}");
    }

    client.dispose().await?;

    println!("\n{}", "=".repeat(60));
    println!("All examples completed!");
    println!("{}", "=".repeat(60));

    Ok(())
}
