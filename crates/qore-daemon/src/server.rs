//! Server lifecycle: bind, serve, and graceful shutdown (teacher's
//! `palm-daemon::server` pattern).

use qore_policy::QoreConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::create_router;
use crate::state::AppState;

pub struct Server {
    config: QoreConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: QoreConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.bind_addr();
        let app = create_router(self.state);

        let listener = TcpListener::bind(&addr).await?;
        let bound = listener.local_addr()?;
        info!(addr = %bound, "qore daemon listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("qore daemon shutting down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}
