//! `verdant chat`: interactive session backed by an in-memory conversation store.

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use verdant_agent::Orchestrator;
use verdant_core::agent::AgentResponse;
use verdant_core::message::{Attachment, Message, SessionId};
use verdant_core::store::{ConversationStore, InMemoryConversationStore};

use super::{load_config, load_images, print_response};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let orchestrator = Orchestrator::from_config(&config);
    let store = InMemoryConversationStore::new();
    let session = SessionId::new();

    println!();
    println!("  Verdant: Interactive Mode");
    println!();
    println!("  Provider:  {} ({})", config.providers.primary.name, config.providers.primary.model);
    if let Some(fallback) = &config.providers.fallback {
        println!("  Fallback:  {} ({})", fallback.name, fallback.model);
    }
    println!("  Agents:    {}", orchestrator.registry().len());
    println!();
    println!("  /image <path>  attach an image to the next message");
    println!("  /metrics       show pipeline metrics");
    println!("  /clear         start over");
    println!("  exit           quit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<Attachment> = Vec::new();
    let mut last_agent: Option<String> = None;

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if let Some(path) = line.strip_prefix("/image ") {
            match load_images(&[PathBuf::from(path.trim())]) {
                Ok(images) => {
                    pending.extend(images);
                    println!("  ({} image(s) attached)", pending.len());
                }
                Err(e) => eprintln!("  [Error] {e}"),
            }
            prompt()?;
            continue;
        }
        if line == "/metrics" {
            println!("{}", serde_json::to_string_pretty(&orchestrator.metrics().snapshot())?);
            prompt()?;
            continue;
        }
        if line == "/clear" {
            store.clear(&session).await?;
            pending.clear();
            last_agent = None;
            println!("  (history cleared)");
            prompt()?;
            continue;
        }

        let history = store.load(&session).await?;
        let attachments = std::mem::take(&mut pending);
        eprint!("  ...");
        let response = orchestrator
            .process_request(line, &history, attachments.clone(), last_agent.as_deref())
            .await;
        eprint!("\r     \r");
        print_response(&response);

        if response.success {
            last_agent = response.selected_agent.clone();
        }
        let user = Message::user(line).with_attachments(attachments);
        store.append(&session, vec![user, reply_message(&response)]).await?;

        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// The assistant turn to keep in history. Failures become error bubbles, which
/// the store drops. Analysis replies that looked at images keep their text as
/// the image analysis note.
fn reply_message(response: &AgentResponse) -> Message {
    let text = response.message.clone().unwrap_or_default();
    let mut message = Message::assistant(text.clone())
        .with_attachments(response.generated_attachments.clone().unwrap_or_default());

    if !response.success {
        message.is_error = true;
        return message;
    }

    let analysed = response
        .metadata
        .get("intent")
        .and_then(|intent| intent.get("type"))
        .and_then(|t| t.as_str())
        == Some("analysis");
    let looked_at_images = response
        .metadata
        .get("selected_image_ids")
        .and_then(|ids| ids.as_array())
        .is_some_and(|ids| !ids.is_empty());
    if analysed && looked_at_images {
        message = message.with_image_analysis(text);
    }
    message
}
