//! Invoke a Braintrust function and print its output as it streams.
//!
//! ```sh
//! BRAINTRUST_API_KEY=... cargo run --example invoke_stream -- my-project greet
//! ```

use braintrust::prelude::*;
use braintrust::telemetry::{init_tracing, LogFormat};
use futures::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::Pretty)?;

    let mut args = std::env::args().skip(1);
    let project = args.next().unwrap_or_else(|| "my-project".to_string());
    let slug = args.next().unwrap_or_else(|| "greet".to_string());

    let client = BraintrustClient::from_env()?;
    let request = InvokeRequest::new(
        FunctionRef::slug(project, slug),
        serde_json::json!({ "name": "Ada" }),
    );

    let mut stream = client.invoke_stream(request).await?;
    let mut live = stream.copy();

    let mut stdout = std::io::stdout();
    while let Some(chunk) = live.next().await {
        write!(stdout, "{}", chunk?.data())?;
        stdout.flush()?;
    }
    println!();

    match stream.final_value().await? {
        FinalValue::Json(value) => {
            println!("final (json): {}", serde_json::to_string_pretty(&value)?)
        }
        FinalValue::Text(text) => println!("final (text): {} chars", text.chars().count()),
        FinalValue::Empty => println!("final: empty"),
    }

    Ok(())
}
