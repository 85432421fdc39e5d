//! `verdant classify`: show how a message would be routed.

use std::path::PathBuf;

use verdant_agent::Orchestrator;

use super::{load_config, load_images};

pub async fn run(message: String, images: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let attachments = load_images(&images)?;
    let orchestrator = Orchestrator::from_config(&config);

    let preview = orchestrator.preview(&message, &[], attachments, None).await;
    let intent = &preview.intent;

    println!();
    println!("  Intent:       {}", intent.intent_type);
    if let Some(subtype) = intent.subtype {
        println!("  Subtype:      {subtype}");
    }
    println!("  Image intent: {}", intent.image_intent);
    println!("  Confidence:   {:.2}", intent.confidence);
    if !intent.reasoning.is_empty() {
        println!("  Reasoning:    {}", intent.reasoning);
    }
    if let Some(language) = preview.context.language {
        println!("  Language:     {}", language.code());
    }
    if preview.selected_image_ids.is_empty() {
        println!("  Images:       none");
    } else {
        println!("  Images:       {}", preview.selected_image_ids.join(", "));
    }
    match (&preview.agent_id, &preview.score) {
        (Some(agent), Some(score)) => println!("  Agent:        {agent} (score {:.2})", score.total()),
        _ => println!("  Agent:        none can handle this intent"),
    }
    println!();

    Ok(())
}
