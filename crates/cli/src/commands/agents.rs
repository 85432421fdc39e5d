//! `verdant agents`: list the registered agents.

use verdant_agent::Orchestrator;
use verdant_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = Orchestrator::from_config(&config);

    println!();
    println!("  Registered agents ({})", orchestrator.registry().len());
    println!("  ====================");
    for agent in orchestrator.registry().list() {
        let profile = agent.profile();
        let capabilities: Vec<String> = profile.capabilities.iter().map(|c| c.to_string()).collect();
        let domains: Vec<&str> = profile.keywords.iter().map(|g| g.domain.as_str()).collect();
        println!();
        println!("  {} ({})", profile.name, profile.id);
        println!("    {}", profile.description);
        println!("    capabilities: {}", capabilities.join(", "));
        println!("    keywords:     {}", domains.join(", "));
    }
    println!();

    Ok(())
}
