//! cortex service
//!
//! Natural-language chat over a Neo4j graph:
//! - HTTP API (`/api/chat`, schema, conversations)
//! - Live step streaming over WebSocket and SSE

use anyhow::{Context, Result};
use clap::Parser;
use cortex_chat::ChatPipeline;
use cortex_core::config::{load_environment, AppConfig, LogFormat, LoggingConfig};
use cortex_events::StepBus;
use cortex_graph::{GraphDriver, Neo4jDriver};
use cortex_introspection::SchemaCache;
use cortex_llm::create_language_model;
use cortex_storage::FileConversationStore;
use cortex_tools::{register_builtin_tools, ToolRegistry};
use cortex_web::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "cortex")]
#[command(about = "Graph chat agent server")]
struct Args {
    /// Bind host (overrides BIND_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_environment();
    let args = Args::parse();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(&config.logging)?;
    match env_file {
        Ok(Some(path)) => info!(path = %path.display(), "Loaded environment file"),
        Ok(None) => debug!("No environment file found, using process environment"),
        Err(e) => warn!(error = %e, "Environment file was not loaded"),
    }

    // --- Graph store ---
    let driver: Arc<dyn GraphDriver> = Arc::new(Neo4jDriver::new(&config.neo4j)?);
    match driver.verify_connectivity().await {
        Ok(()) => info!(uri = %config.neo4j.uri, "Connected to Neo4j"),
        Err(e) => warn!(
            uri = %config.neo4j.uri,
            error = %e,
            "Neo4j is not reachable; chat requests will report the database as unavailable until it is"
        ),
    }

    // --- Language model ---
    let llm = create_language_model(&config.llm)?;
    info!(endpoint = %llm.endpoint(), model = %config.llm.model, "Language model configured");

    // --- Tools, bus, schema cache, pipeline ---
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry)?;
    let registry = Arc::new(registry);
    info!(tools = registry.len(), "Initialized tool registry");

    let bus = StepBus::new();
    let schema = Arc::new(SchemaCache::new(driver.clone()));
    let pipeline = Arc::new(ChatPipeline::new(registry.clone(), bus, driver, schema.clone(), llm));

    let conversations = Arc::new(FileConversationStore::new(
        config.storage.conversations_path.clone(),
    ));
    info!(path = %conversations.dir().display(), "Conversation storage ready");

    // --- HTTP server ---
    let state = Arc::new(AppState::new(pipeline, schema, registry, conversations));
    let app = create_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "cortex listening");
    info!("WebSocket step stream: ws://{}/ws/steps/<requestId>", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Console and daily-file logging. The returned guard flushes the file
/// writer and must live until shutdown.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(&logging.level).add_directive("tower_http=info".parse()?),
    };

    let console = logging.to_console.then(|| match logging.format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Text => fmt::layer().boxed(),
    });

    let (file, guard) = if logging.to_file {
        std::fs::create_dir_all(&logging.output_path).with_context(|| {
            format!("Failed to create log directory {}", logging.output_path.display())
        })?;
        let appender = rolling::Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix("cortex")
            .filename_suffix("log")
            .build(&logging.output_path)
            .with_context(|| {
                format!("Failed to open log file in {}", logging.output_path.display())
            })?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        let layer = match logging.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Text => layer.boxed(),
        };
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received terminate signal, shutting down..."),
    }
}
