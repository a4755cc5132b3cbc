//! DocChat Gateway
//!
//! HTTP entry point for the chat assistant.
//! Handles:
//! - Chat routing (location, weather, time, documents, general answers)
//! - Document upload, listing, download, and deletion
//! - Static UI serving
//! - Observability (logging, metrics, request ids)

mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use docchat_common::{
    assistant::{weather_http_client, Clock, ReverseGeocoder, WeatherService},
    config::{AppConfig, ObservabilityConfig},
    embeddings::{create_embedder, EmbeddingProvider},
    errors::Result,
    llm::{create_chat_model, ChatModel},
    metrics::{self, EMBEDDING_BUCKETS},
    retrieval::{DocumentStore, RelevanceRanker},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: DocumentStore,
    pub ranker: RelevanceRanker,
    pub chat_model: Arc<dyn ChatModel>,
    pub weather: WeatherService,
    pub geocoder: ReverseGeocoder,
    pub clock: Clock,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire every collaborator from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = DocumentStore::new(&config.storage.upload_dir);
        store.ensure_dir()?;

        let embedder = create_embedder(&config.embedding)?;
        let provider =
            EmbeddingProvider::new(embedder).with_max_input_chars(config.embedding.max_input_chars);
        let ranker = RelevanceRanker::new(provider)
            .with_threshold(config.retrieval.threshold)
            .with_prefix_chars(config.retrieval.document_prefix_chars);

        let http = weather_http_client(&config.weather)?;

        Ok(Self {
            store,
            ranker,
            chat_model: create_chat_model(&config.llm)?,
            weather: WeatherService::new(http.clone(), &config.weather),
            geocoder: ReverseGeocoder::new(http, &config.weather),
            clock: Clock::new(config.clock.timezone.clone()),
            metrics: None,
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting DocChat Gateway v{}", docchat_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    let prometheus = install_prometheus()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let mut state = AppState::from_config(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize application state");
        e
    })?;
    state.metrics = Some(prometheus);

    info!(
        upload_dir = %state.store.dir().display(),
        model = state.chat_model.model_name(),
        "Application state ready"
    );

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("embedding_duration_seconds".to_string()),
            EMBEDDING_BUCKETS,
        )?
        .install_recorder()?;
    Ok(handle)
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

    let uploads = ServeDir::new(state.store.dir());
    let static_files = ServeDir::new(&state.config.server.static_dir);
    let public_route = state.config.storage.public_route.clone();
    let body_limit = state.config.storage.max_upload_bytes;
    let timeout = state.config.request_timeout();

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Chat
        .route("/chat", post(handlers::chat::chat))
        .route("/get_city", post(handlers::location::get_city))

        // Documents
        .route("/upload", post(handlers::files::upload))
        .route("/files", get(handlers::files::list_files))
        .route("/delete/{name}", delete(handlers::files::delete_file))
        .nest_service(&public_route, uploads)

        // Static UI
        .fallback_service(static_files)

        .layer(DefaultBodyLimit::max(body_limit))
        .layer(request_timeout_layer(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Requests running past `timeout` are answered with 408
fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        response::Response,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docchat-test-boundary";

    fn test_app(threshold: f32) -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.upload_dir = dir.path().join("uploads");
        config.server.static_dir = dir.path().join("static");
        config.retrieval.threshold = threshold;
        let state = AppState::from_config(config).unwrap();
        (create_router(state), dir)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat_request(message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "message": message }).to_string()))
            .unwrap()
    }

    fn upload_request(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = test_app(0.78);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_document_question_without_uploads() {
        let (app, _dir) = test_app(0.78);
        let response = app
            .oneshot(chat_request("Summarize the report please"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["response"],
            "<p>No documents uploaded yet.</p>"
        );
    }

    #[tokio::test]
    async fn test_location_without_cookies() {
        let (app, _dir) = test_app(0.78);
        let response = app.oneshot(chat_request("where am i?")).await.unwrap();
        let body = json_body(response).await;
        assert!(body["response"]
            .as_str()
            .unwrap()
            .contains("can’t determine your location"));
    }

    #[tokio::test]
    async fn test_upload_list_serve_delete() {
        let (app, _dir) = test_app(0.78);

        let response = app
            .clone()
            .oneshot(upload_request("my notes.txt", "cats are great pets"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "my_notes.txt uploaded successfully"
        );

        let response = app
            .clone()
            .oneshot(Request::get("/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!(["my_notes.txt"]));

        let response = app
            .clone()
            .oneshot(Request::get("/uploads/my_notes.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"cats are great pets");

        let delete = || {
            Request::delete("/delete/my_notes.txt")
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let (app, _dir) = test_app(0.78);
        let response = app
            .oneshot(upload_request("script.exe", "MZ"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_document_answer_includes_references() {
        // every document clears a threshold of -1
        let (app, _dir) = test_app(-1.0);

        app.clone()
            .oneshot(upload_request("cats.txt", "cats are great pets"))
            .await
            .unwrap();

        let response = app
            .oneshot(chat_request("what does the document say about cats"))
            .await
            .unwrap();
        let body = json_body(response).await;
        let html = body["response"].as_str().unwrap();
        assert!(html.contains("<h5>📚 References</h5>"));
        assert!(html.contains(r#"<a href="/uploads/cats.txt" target="_blank">cats.txt</a>"#));
    }

    #[tokio::test]
    async fn test_get_city_requires_coordinates() {
        let (app, _dir) = test_app(0.78);
        let response = app
            .oneshot(
                Request::post("/get_city")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"lat": 1.29}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["city"], "Unknown");
    }

    #[tokio::test]
    async fn test_document_question_without_relevant_match() {
        // cosine similarity never exceeds 1
        let (app, _dir) = test_app(2.0);

        app.clone()
            .oneshot(upload_request("cats.txt", "cats are great pets"))
            .await
            .unwrap();

        let response = app
            .oneshot(chat_request("what does the document say about cats"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["response"],
            "<p>❌ I couldn’t find relevant info in your uploaded documents.</p>"
        );
    }

    #[tokio::test]
    async fn test_long_message_is_answered() {
        let (app, _dir) = test_app(0.78);
        let message = "tell me a story ".repeat(1_000);
        let response = app.oneshot(chat_request(&message)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["response"]
            .as_str()
            .unwrap()
            .starts_with("<p>Mock answer about <b>tell me a story"));
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(request_timeout_layer(Duration::from_millis(20)));

        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
