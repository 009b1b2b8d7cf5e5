use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod audit;
mod config;
mod error;
mod handlers;
mod invites;
mod middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up INVITE_TOKENS, Upstash
    // credentials, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();
    tracing::info!(
        mode = ?config.gate.mode,
        invites = config.gate.invites.len(),
        audit_ttl_days = config.audit.ttl_days,
        "Starting FM-Coach web front-end"
    );

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 FM-Coach web server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::pages::chat_page))
        .route("/login", get(handlers::pages::login_page))
        .route("/health", get(handlers::health::health))
        // API namespace (excluded from the gate)
        .merge(api_routes())
        // The gate wraps everything; its internal exclusion list keeps the
        // login page, API and asset paths reachable.
        .layer(axum::middleware::from_fn(middleware::gate_middleware))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router {
    Router::new()
        .route("/api/audit", post(handlers::audit::audit_post))
        .route("/api/create-session", post(handlers::session::create_session_post))
}
