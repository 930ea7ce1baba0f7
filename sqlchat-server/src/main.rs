use std::sync::Arc;

use clap::Parser;
use sqlchat_core::SqlChatConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use sqlchat_server::context::AppContext;
use sqlchat_server::server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "sqlchat.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (OPENAI_API_KEY in development)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match SqlChatConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let ctx = match AppContext::from_config(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            if args.health {
                println!("❌ Chat model client unavailable: {}", e);
            } else {
                eprintln!("Failed to initialise chat model client: {}", e);
            }
            std::process::exit(1);
        }
    };

    if args.health {
        println!("✅ Chat model: {}", ctx.llm.model());
        println!("✅ Endpoint: {}", ctx.config.llm.base_url);
        println!("✅ Prompt profile: {}", ctx.config.prompt.profile);
        println!("✅ sqlchat health check passed");
        return Ok(());
    }

    let ctx = Arc::new(ctx);
    tracing::info!(
        model = ctx.llm.model(),
        profile = %ctx.config.prompt.profile,
        "sqlchat server starting"
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // HTTP session API, if enabled
    if ctx.config.http.enabled {
        let http_ctx = ctx.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = sqlchat_server::http::start_http_server(http_ctx, http_shutdown).await {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = ctx.config.service.socket_path.clone();
    server::run_unix_server(&socket_path, ctx, tx.subscribe()).await?;

    Ok(())
}
