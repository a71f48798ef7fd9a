use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    renew_sync::{
        adapters::{notifier::HttpNotifier, webhook},
        domain::notify::{Notifier, NoopNotifier},
        services::coordinator::RenewalCoordinator,
    },
    sqlx::postgres::PgPoolOptions,
    std::{env, sync::Arc, time::Duration},
    tokio::signal,
    tower::ServiceBuilder,
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let webhook_secret = env::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET must be set");
    let api_key = env::var("API_KEY").expect("API_KEY must be set");
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let notifier: Arc<dyn Notifier> = match env::var("NOTIFY_URL") {
        Ok(url) if !url.is_empty() => {
            tracing::info!(%url, "payment notifications enabled");
            Arc::new(HttpNotifier::new(url, Duration::from_secs(5)))
        }
        _ => Arc::new(NoopNotifier),
    };

    let state = renew_sync::AppState {
        pool,
        webhook_secret: webhook_secret.into(),
        api_key: api_key.into(),
        coordinator: Arc::new(RenewalCoordinator::new()),
        notifier,
        batch_deadline: Duration::from_secs(60),
    };

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/webhook",
            get(webhook::webhook_info).post(webhook::webhook_handler),
        )
        .route("/api/renewals/retry", post(webhook::retry_handler))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(64 * 1024)) // 64 KB, gateway payloads are small
                // Covers the batch endpoint's worst case with headroom.
                .layer(TimeoutLayer::new(Duration::from_secs(90))),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
