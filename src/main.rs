use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use persona_core::security::ApiKey;
use persona_engine::{ConversationEngine, EngineConfig, Profile};
use persona_llm::GroqProvider;
use persona_server::{AppState, ServerConfig};
use persona_store::{CheckpointRepo, Database};

#[derive(Parser, Debug)]
#[command(name = "persona", about = "Profile-Q&A chatbot backend")]
struct Args {
    /// Port to serve on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Path to the checkpoint database.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Completion model name.
    #[arg(long)]
    model: Option<String>,

    /// Path to a profile JSON overriding the bundled one.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Refuse open-ended queries with a fixed policy response.
    #[arg(long, env = "PERSONA_RESTRICT_OPEN_ENDED", default_value_t = false)]
    restrict_open_ended: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("starting persona server");

    let api_key = ApiKey::from_env("GROQ_API_KEY").expect("GROQ_API_KEY must be set");

    let db_path = args
        .db_path
        .unwrap_or_else(|| home_dir().join(".persona").join("checkpoints.db"));
    let db = Database::open(&db_path).expect("failed to open checkpoint database");

    let profile = match &args.profile {
        Some(path) => {
            let raw = std::fs::read_to_string(path).expect("failed to read profile file");
            Profile::from_json(&raw).expect("profile file is not valid JSON")
        }
        None => Profile::builtin(),
    };

    let provider = Arc::new(GroqProvider::new(api_key, args.model.as_deref()));
    let registry = Arc::new(persona_engine::tools::create_default_registry(
        Arc::new(profile),
        args.restrict_open_ended,
    ));
    let engine = ConversationEngine::new(
        provider.clone(),
        registry,
        CheckpointRepo::new(db),
        EngineConfig::default(),
    );

    let state = AppState {
        engine: Arc::new(engine),
        completion: provider.clone(),
        extractor: provider,
    };

    let config = ServerConfig { port: args.port };
    let handle = persona_server::start(config, state)
        .await
        .expect("failed to start server");

    tracing::info!(port = handle.port, "persona server ready");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
