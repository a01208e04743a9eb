//! Hasker-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use hasker_api::{AppState, router as api_router};
use hasker_common::Config;
use hasker_core::{EmailService, JobService, JobWorkerContext};
use hasker_db::repositories::{QuestionRepository, UserProfileRepository, UserRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body (questions and answers are plain text).
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hasker=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting hasker-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(hasker_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    hasker_db::migrate(&db).await?;
    info!("Migrations completed");

    // Answer notifications
    let email = EmailService::from_settings(&config.email, config.base_url())?;
    if email.is_enabled() {
        info!(from = %config.email.from_address, "Answer notification emails enabled");
    } else {
        info!("Answer notification emails disabled");
    }

    let job_service = JobService::new();
    let state = AppState::new(
        Arc::clone(&db),
        config.site.clone(),
        Some(job_service.sender()),
    );
    let jobs = job_service.start(JobWorkerContext {
        question_repo: QuestionRepository::new(Arc::clone(&db)),
        user_repo: UserRepository::new(Arc::clone(&db)),
        profile_repo: UserProfileRepository::new(Arc::clone(&db)),
        email,
    });

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            hasker_api::middleware::auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last job senders; let queued notifications finish
    info!("Waiting for pending jobs...");
    if let Err(e) = jobs.await {
        error!(error = %e, "Job worker panicked");
    }

    info!("Server shutdown complete");
    Ok(())
}
