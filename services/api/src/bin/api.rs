//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        CloudinaryAdapter, DbAdapter, HttpMailAdapter, InMemoryAttemptCounter, InMemoryDb,
        LogOnlyMailer, OpenAiFeedbackAdapter, PgAttemptCounter, UnavailableImageStore,
    },
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use academy_core::ports::{
    AttemptCounter, DatabaseService, ImageStore, InterviewFeedbackService, MailService,
};
use async_openai::{config::OpenAIConfig, Client};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Store & Run Migrations ---
    let (db, interview_attempts): (Arc<dyn DatabaseService>, Arc<dyn AttemptCounter>) =
        match &config.database_url {
            Some(url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
                let db_adapter = DbAdapter::new(db_pool.clone());
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                (
                    Arc::new(db_adapter),
                    Arc::new(PgAttemptCounter::new(db_pool)),
                )
            }
            None => {
                warn!("DATABASE_URL is not set; using the in-memory store. Data is lost on restart.");
                (
                    Arc::new(InMemoryDb::new()),
                    Arc::new(InMemoryAttemptCounter::new()),
                )
            }
        };

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::new();

    let mailer: Arc<dyn MailService> = match config.mail.clone() {
        Some(mail) => Arc::new(HttpMailAdapter::new(http.clone(), mail)),
        None => {
            warn!("Mail API is not configured; outgoing emails will only be logged.");
            Arc::new(LogOnlyMailer)
        }
    };

    let images: Arc<dyn ImageStore> = match config.image_store.clone() {
        Some(store) => Arc::new(CloudinaryAdapter::new(http.clone(), store)),
        None => {
            warn!("Image store is not configured; review uploads will fail.");
            Arc::new(UnavailableImageStore)
        }
    };

    let feedback: Option<Arc<dyn InterviewFeedbackService>> =
        config.openai_api_key.as_ref().map(|key| {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(key));
            Arc::new(OpenAiFeedbackAdapter::new(
                openai_client,
                config.feedback_model.clone(),
            )) as Arc<dyn InterviewFeedbackService>
        });
    if feedback.is_none() {
        warn!("OPENAI_API_KEY is not set; interviews are stored without feedback.");
    }
    if config.voice.webhook_secret.is_none() {
        warn!("VAPI_WEBHOOK_SECRET is not set; every voice webhook call will be rejected.");
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db,
        config: config.clone(),
        mailer,
        images,
        feedback,
        interview_attempts,
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
