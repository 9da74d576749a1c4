use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

use oxidized_health::{
    agents::ChatDispatcher,
    config::Config,
    db::{self, LogStore, MemoryLogStore, PgLogStore},
    demo,
    middleware::RateLimiter,
    routes::create_router,
    search::{KnowledgeBase, ReferenceRetriever},
    utils::init_logging,
    AppState,
};

#[derive(Parser)]
#[command(name = "oxidized-health", version, about = "Multi-agent health tracking assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create the demo user with a week of sample data
    SeedDemo,
    /// Send one message as an existing user and print the reply
    Chat {
        #[arg(long)]
        user: Uuid,
        message: String,
    },
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn LogStore>> {
    match &config.database.url {
        Some(url) => {
            let pool = db::create_pool(&config.database, url).await?;
            db::run_migrations(&pool).await?;
            Ok(Arc::new(PgLogStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set; logs are kept in memory and lost on exit");
            Ok(Arc::new(MemoryLogStore::new()))
        }
    }
}

/// Guideline documents under the user data directory, if present
fn default_knowledge_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("oxidized-health").join("knowledge"))
        .filter(|dir| dir.is_dir())
}

fn load_knowledge(config: &Config) -> Option<Arc<dyn ReferenceRetriever>> {
    let dir = config.knowledge.dir.clone().or_else(default_knowledge_dir)?;
    match KnowledgeBase::load_dir(&dir) {
        Ok(kb) if kb.is_empty() => {
            warn!(dir = %dir.display(), "Knowledge directory has no documents");
            None
        }
        Ok(kb) => {
            info!(dir = %dir.display(), documents = kb.len(), "Knowledge base loaded");
            Some(Arc::new(kb))
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to load knowledge base, continuing without it");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = init_logging(&config.logging);
    info!("Configuration loaded: {:?}", config.server);

    let store = open_store(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::SeedDemo => {
            let user = demo::seed_demo_user(store.as_ref()).await?;
            println!("Seeded demo user {} ({})", user.name, user.id);
            return Ok(());
        }
        Command::Chat { user, message } => {
            if store.get_user(user).await?.is_none() {
                anyhow::bail!("user {user} not found");
            }
            let dispatcher = ChatDispatcher::from_config(store, &config, load_knowledge(&config))?;
            let reply = dispatcher.respond(user, &message).await;
            println!("{}", reply.text);
            return Ok(());
        }
        Command::Serve => {}
    }

    let dispatcher = ChatDispatcher::from_config(store.clone(), &config, load_knowledge(&config))?;

    // Create shared state
    let state = AppState {
        store,
        dispatcher: Arc::new(dispatcher),
        rate_limiter: Arc::new(RateLimiter::per_minute(config.server.rate_limit_per_minute)),
        config: config.clone(),
    };

    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
