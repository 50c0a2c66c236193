use axum::{routing::get, Router};
use std::env;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analytics;
mod auth;
mod config;
mod db;
mod error;
mod feedback;
mod models;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "canacademy_backend=info,axum=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load()?;
    let pool = db::connect(&config.database_url).await?;
    // crate-relative path for sqlx migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    // overlapping feedback ranges are a reference-data bug; refuse to start
    let templates: Vec<models::FeedbackTemplate> =
        sqlx::query_as("SELECT * FROM feedback_templates ORDER BY id")
            .fetch_all(&pool)
            .await?;
    if let Err(e) = feedback::validate_templates(&templates) {
        anyhow::bail!("feedback reference data is invalid: {e}");
    }
    tracing::info!(count = templates.len(), "feedback templates validated");

    let port = config.port;
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(state::AppState::new(pool, config)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
