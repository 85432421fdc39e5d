//! `verdant ask`: route one message and print the response.

use std::path::PathBuf;

use tracing::debug;
use verdant_agent::Orchestrator;

use super::{load_config, load_history, load_images, print_response};

pub async fn run(
    message: String,
    images: Vec<PathBuf>,
    history: Option<PathBuf>,
    agent: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let attachments = load_images(&images)?;
    let history = load_history(history.as_deref())?;
    debug!(history = history.len(), images = attachments.len(), "Loaded request inputs");

    let orchestrator = Orchestrator::from_config(&config);
    let response = orchestrator
        .process_request(&message, &history, attachments, agent.as_deref())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }

    if !response.success {
        return Err("request failed".into());
    }
    Ok(())
}
