use anyhow::Context;

use life_planner::app;
use life_planner::cli;
use life_planner::config::PlannerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PlannerConfig::from_env()?;

    eprintln!("🗓️  Life Planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flow: {}", config.flow);
    match config.llm {
        Some(ref llm) => eprintln!("   Model: {}", llm.model),
        None => eprintln!("   Model: none (OPENAI_API_KEY not set, using built-in suggestions)"),
    }
    match config.db_path {
        Some(ref path) => eprintln!("   Database: {}", path.display()),
        None => eprintln!("   Database: in-memory"),
    }

    let engine = app::build_engine(&config)
        .await
        .context("failed to start the questionnaire")?;

    cli::run(&engine).await;
    Ok(())
}
