pub mod agents;
pub mod ask;
pub mod chat;
pub mod classify;
pub mod onboard;

use std::path::{Path, PathBuf};

use verdant_config::AppConfig;
use verdant_core::agent::AgentResponse;
use verdant_core::message::{Attachment, Message};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load the config and make sure a key is available before any request goes out.
pub fn load_config() -> CliResult<AppConfig> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.providers.primary.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    VERDANT_API_KEY=sk-...       (primary provider)");
        eprintln!("    OPENROUTER_API_KEY=sk-or-... (primary provider, OpenRouter)");
        eprintln!();
        eprintln!("  Or add api_keys to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    Ok(config)
}

/// Read image files into attachments named after the file.
pub fn load_images(paths: &[PathBuf]) -> CliResult<Vec<Attachment>> {
    paths
        .iter()
        .map(|path| {
            let data = std::fs::read(path)
                .map_err(|e| format!("Failed to read image {}: {e}", path.display()))?;
            let id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(Attachment::image(data, mime_type(path)).with_id(id))
        })
        .collect()
}

/// Read a JSON array of messages.
pub fn load_history(path: Option<&Path>) -> CliResult<Vec<Message>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    let history = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid history file {}: {e}", path.display()))?;
    Ok(history)
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

/// Print a response the way a person reads it.
pub fn print_response(response: &AgentResponse) {
    let agent = response.selected_agent.as_deref().unwrap_or("none");
    let message = response.message.as_deref().unwrap_or_default();

    if response.success {
        println!();
        for line in message.lines() {
            println!("  {agent} > {line}");
        }
    } else {
        println!();
        println!("  {message}");
        if let Some(error) = &response.error {
            eprintln!("  [{}] {} ({} ms)", error.kind, error.message, error.elapsed_ms);
        }
    }

    for image in response.generated_attachments.iter().flatten() {
        println!(
            "  [generated image {} | {} | {} bytes]",
            image.id,
            image.mime_type,
            image.len()
        );
    }
    println!();
}
