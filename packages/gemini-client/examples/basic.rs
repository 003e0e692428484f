//! Basic Gemini client usage example

use gemini_client::{Content, GeminiClient, GenerateRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize from environment
    let client = GeminiClient::from_env()?;

    // Single prompt
    println!("=== Generate Text ===");
    let text = client
        .generate_text("gemini-2.0-flash", "What is Rust in one sentence?")
        .await?;
    println!("Response: {}", text);

    // Full request with system instruction and sampling config
    println!("\n=== Generate Content ===");
    let response = client
        .generate_content(
            GenerateRequest::new("gemini-2.0-flash")
                .system("You are a helpful librarian. Answer in plain text.")
                .content(Content::user("Suggest one classic novel."))
                .temperature(0.7)
                .max_output_tokens(100),
        )
        .await?;

    println!("Response: {}", response.text);
    if let Some(usage) = response.usage {
        println!("Tokens used: {}", usage.total_token_count);
    }

    Ok(())
}
