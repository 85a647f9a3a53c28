mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::Settings;
use core::{hospital_name_contains, MatchingEngine};
use routes::matches::AppState;
use services::{EmbeddingClient, RegistryClient};
use std::sync::Arc;
use tracing::{error, info};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration before logging so the subscriber can be built from it
    let settings = Settings::load().unwrap_or_else(|e| {
        panic!("Configuration error: {}", e);
    });

    // Initialize logging; RUST_LOG still wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Trialmatch service...");
    info!("Configuration loaded successfully");

    // Initialize the registry client
    let registry = Arc::new(RegistryClient::new(
        settings.registry.endpoint.clone(),
        settings.registry.page_size,
        settings.registry.timeout_secs,
    ));

    info!("Registry client initialized ({})", settings.registry.endpoint);

    // Initialize the embedding client
    let embeddings = Arc::new(EmbeddingClient::new(
        settings.embedding.endpoint.clone(),
        settings.embedding.api_key.clone(),
        settings.embedding.model.clone(),
        settings.embedding.cache_size,
    ));

    info!(
        "Embedding client initialized (model: {}, cache: {} entries)",
        settings.embedding.model, settings.embedding.cache_size
    );

    // Build the matching engine; invalid weights/limits are fatal at startup
    let match_config = settings.match_config();
    let engine = MatchingEngine::new(embeddings, match_config)
        .unwrap_or_else(|e| {
            error!("Invalid matching configuration: {}", e);
            panic!("Configuration error: {}", e);
        })
        .with_site_filter(hospital_name_contains());

    info!(
        "Matching engine initialized (strategy: {:?}, top_n: {})",
        engine.config().strategy,
        engine.config().top_n
    );

    // Build application state
    let app_state = AppState {
        registry,
        engine: Arc::new(engine),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
