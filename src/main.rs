use anyhow::Context;

use hobby_guide::config::AppConfig;
use hobby_guide::conversation::{ConversationEngine, SessionStore, app};
use hobby_guide::llm::{CompletionClient, create_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // A missing API key is not fatal: every reply will carry the error instead.
    let provider = create_provider(&config.llm).context("Failed to create LLM provider")?;
    let completion = CompletionClient::new(provider, &config.llm);

    eprintln!("🎨 Hobby Guide v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!(
        "   API key: {}",
        if completion.is_configured() {
            "configured"
        } else {
            "missing (replies will report the error)"
        }
    );
    eprintln!("   Interests before moving on: {}", config.conversation.min_interests);
    eprintln!("   CORS origin: {}", config.server.cors_origin);

    let engine = ConversationEngine::new(completion, config.conversation.clone());
    let store = SessionStore::new(engine);
    let router = app(store, &config.server).context("Failed to build router")?;

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    eprintln!("   Chat API: http://{}/api/chat\n", addr);
    tracing::info!(%addr, "Hobby Guide server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}
