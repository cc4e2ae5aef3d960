use options_desk::config::AppConfig;
use options_desk::state::AppState;
use options_desk::{console, server};

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // `options_desk console` runs the interactive pricer instead of the server
    if std::env::args().nth(1).as_deref() == Some("console") {
        let stdin = std::io::stdin();
        let result = tokio::task::spawn_blocking(move || {
            console::run(stdin.lock(), std::io::stdout(), &cfg)
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("console error: {e}");
                std::process::exit(1);
            }
            Err(e) => {
                tracing::error!("console task panicked: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    tracing::info!("options_desk starting");
    if cfg.finnhub_api_key.is_none() {
        tracing::warn!("FINNHUB_API_KEY not set, /api/quote will be unavailable");
    }

    let port = cfg.server_port;
    let app = server::router(AppState::new(cfg));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
