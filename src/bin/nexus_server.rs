use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use nexus::ai::{GeminiClient, ModelConfig, ScriptedModel, TextModel};
use nexus::api::{auth, create_api_router, AppState};
use nexus::config::AppConfig;
use nexus::render::DocumentRenderer;
use nexus::vault::{MemoryStore, SecretStore, VaultClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "nexus=info,tower_http=debug".to_string()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Database connection
    info!("Connecting to database: {}", config.database_url);
    let pool = sqlx::PgPool::connect(&config.database_url).await?;

    // Step catalog (YAML override or compiled-in default)
    let catalog = Arc::new(config.load_step_catalog()?);
    info!("Loaded step catalog with {} steps", catalog.len());

    // Text model: Gemini when a key is configured, scripted echo otherwise
    let model_config = ModelConfig::default();
    let model: Arc<dyn TextModel> = if model_config.api_key.is_empty() {
        warn!("GEMINI_API_KEY not set - using scripted text model");
        Arc::new(ScriptedModel::new())
    } else {
        Arc::new(GeminiClient::new(model_config)?)
    };

    // Secret vault: HTTP vault when a token is configured, in-memory otherwise
    let secrets: Arc<dyn SecretStore> = if config.vault_token.is_empty() {
        warn!("VAULT_TOKEN not set - using in-memory secret store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(VaultClient::new(&config.vault_addr, &config.vault_token)?)
    };

    let renderer = Arc::new(DocumentRenderer::new(
        config.pdf_compiler.clone(),
        config.document_dir.clone(),
    ));

    let state = AppState {
        pool,
        catalog,
        model,
        secrets,
        renderer,
        sessions: auth::new_session_store(),
    };

    let app = create_api_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
