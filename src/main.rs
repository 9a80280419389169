mod config;
mod error;
mod model;
mod predict;
mod report;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::predict::AppState;

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness
        .route("/", get(predict::home))
        .route("/api/predict", post(predict::predict))
        .route("/api/report", post(report::generate_report))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // The browser frontend is served from a different origin
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diabetes_risk_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    // Load the classifier once; every request shares it read-only
    let model = model::Classifier::load(&config.model_path)?;
    tracing::info!(
        "Loaded model {} from {} ({})",
        model.version(),
        config.model_path.display(),
        model.description().unwrap_or("no description")
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, model });

    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Diabetes prediction API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
