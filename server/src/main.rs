mod error;
mod pipeline;
mod prompt;
mod routes;
mod server_config;
mod state;

use std::env;

use axum::extract::FromRef;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipeline::extractor::AnalysisApi;
use prompt::PromptClient;
use routes::AppRouter;
use server_config::cfg;
use state::tasks::TaskRegistry;

pub type HttpClient = reqwest::Client;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub http_client: HttpClient,
    pub analysis_api: AnalysisApi,
    pub prompt_client: PromptClient,
    pub tasks: TaskRegistry,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
        .init();

    let http_client = reqwest::ClientBuilder::new().use_rustls_tls().build()?;
    let analysis_api = AnalysisApi::from_cfg(http_client.clone())?;
    let prompt_client = PromptClient::from_cfg(http_client.clone())?;

    let state = ServerState {
        http_client,
        analysis_api,
        prompt_client,
        tasks: TaskRegistry::new(),
    };

    let router = AppRouter::create(state);

    let port = env::var("PORT").unwrap_or_else(|_| cfg.server.port.to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Outreach server running on http://0.0.0.0:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        },
    }
}
