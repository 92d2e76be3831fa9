use hopeline::{app, config::Config, db, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const STORE_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = Config::from_env()?;

    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to PostgreSQL");

    let port = config.port;
    let shared_state = Arc::new(AppState::new(config, db_pool));

    // Sweeps expired assessment progress that is never read again
    let purge_state = shared_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STORE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_state.assessment_store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "purged expired assessment progress");
            }
        }
    });

    let app = app(shared_state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    tracing::info!("HopeLine API listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,hopeline=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,hopeline=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // LOG_FORMAT=json for log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::info!("HopeLine API starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    let gemini_configured = std::env::var("GEMINI_API_KEY").is_ok();
    let db_configured = std::env::var("DATABASE_URL").is_ok();
    tracing::info!(
        "Configuration - Database: {}, Gemini AI: {}",
        if db_configured { "set" } else { "missing" },
        if gemini_configured { "set" } else { "missing" }
    );

    Ok(())
}
