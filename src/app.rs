use crate::config::Config;
use crate::llm::ChatCompletionClient;
use crate::ocr::HttpOcrClient;
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::{RouterOptions, create_router};
use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Slack past the upstream timeout before a pending call is treated as lost.
const STALL_GRACE: Duration = Duration::from_secs(30);

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Create a new App instance with its upstream clients initialized
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let recognizer = HttpOcrClient::new(config.ocr_url.clone(), config.upstream_timeout)
            .context("Failed to create OCR client")?;
        let planner =
            ChatCompletionClient::from_config(&config).context("Failed to create LLM client")?;

        if config.openrouter_api_key.is_none() {
            warn!("OPENROUTER_API_KEY is not set; plan generation will always fail");
        }

        info!(
            ocr_url = %config.ocr_url,
            llm_base_url = %config.llm_base_url,
            llm_model = %config.llm_model,
            upstream_timeout = fmt_duration(config.upstream_timeout),
            "upstream clients configured"
        );

        let app_state = AppState::new(Arc::new(recognizer), Arc::new(planner));
        app_state
            .sessions
            .spawn_eviction(config.session_ttl, config.upstream_timeout + STALL_GRACE);

        Ok(App { config, app_state })
    }

    /// Serve HTTP until a shutdown signal arrives.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, %addr, "Failed to bind listener");
                return ExitCode::FAILURE;
            }
        };

        let router = create_router(
            self.app_state,
            RouterOptions {
                // Leave room for the upstream call plus our own processing.
                request_timeout: self.config.upstream_timeout + Duration::from_secs(10),
                cors_origin: self.config.cors_origin.clone(),
            },
        );

        info!(%addr, "web server listening");

        let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    signal_rx.await.ok();
                })
                .await
        });

        shutdown_signal().await;
        info!(
            timeout = fmt_duration(self.config.shutdown_timeout),
            "shutdown signal received, draining connections"
        );
        let _ = signal_tx.send(());

        match tokio::time::timeout(self.config.shutdown_timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("graceful shutdown complete");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "web server exited with error");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = %e, "web server task panicked");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!("shutdown timed out; exiting with connections still open");
                ExitCode::FAILURE
            }
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
