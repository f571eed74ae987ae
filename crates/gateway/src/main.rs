//! Sangkwon API Gateway
//!
//! The entry point for all external API requests. Handles:
//! - Request routing and validation
//! - Wiring of the data gateways, retrieval, and chat-model clients
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use sangkwon_common::{
    analysis::MarketAnalyzer,
    chat::SessionStore,
    config::AppConfig,
    embeddings::OpenAiEmbedder,
    gateways::{estate::EstateGateway, places::PlacesGateway, population::PopulationGateway},
    llm::{ChatModel, OpenAiChat},
    metrics,
    rag::QueryEngine,
    retrieval::WeaviateRetriever,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<QueryEngine>,
    pub analyzer: Arc<MarketAnalyzer>,
    pub llm: Arc<dyn ChatModel>,
    pub estate: Arc<EstateGateway>,
    pub population: Arc<PopulationGateway>,
    pub places: Arc<PlacesGateway>,
    pub sessions: Arc<SessionStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting Sangkwon API Gateway v{}", sangkwon_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let metrics_addr =
            SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    // Wire the external clients
    let embedder = Arc::new(OpenAiEmbedder::new(&config.embedding)?);
    let retriever = Arc::new(WeaviateRetriever::new(&config.retrieval, embedder)?);
    let llm: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(&config.llm)?);
    let engine = Arc::new(QueryEngine::new(
        retriever,
        llm.clone(),
        config.retrieval.top_k,
    ));

    // Wire the data gateways
    let estate = Arc::new(EstateGateway::new(&config.data)?);
    let population = Arc::new(PopulationGateway::new(&config.data)?);
    let places = Arc::new(PlacesGateway::new(&config.data)?);

    let analyzer = Arc::new(MarketAnalyzer::new(
        engine.clone(),
        estate.clone(),
        population.clone(),
        places.clone(),
    ));

    // Create app state
    let state = AppState {
        config: config.clone(),
        engine,
        analyzer,
        llm,
        estate,
        population,
        places,
        sessions: Arc::new(SessionStore::new(config.chat.max_messages)),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Health endpoints
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health))
        // Free-form questions grounded in a prior analysis
        .route("/ask", post(handlers::ask::ask))
        // Multi-turn consultation
        .route("/chat", post(handlers::ask::chat))
        // Analysis over caller-supplied data
        .route("/analyze", post(handlers::analyze::analyze))
        // Data and composite-report endpoints
        .route(
            "/similar_business_info",
            get(handlers::market::similar_business_info),
        )
        .route(
            "/recommend_business",
            get(handlers::market::recommend_business),
        )
        .route(
            "/location_analysis",
            get(handlers::market::location_analysis),
        )
        .route("/analyze_market", get(handlers::market::analyze_market))
        .route("/geocode", get(handlers::market::geocode))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
