use anyhow::Result;
use arith_mcp_core::Dispatcher;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::mcp::session::SessionManager;
use crate::mcp::transport::{handle_mcp_delete, handle_mcp_get, handle_mcp_post};

pub struct Server {
    dispatcher: Arc<Dispatcher>,
    mcp_sessions: Arc<SessionManager>,
    settings: ServerConfig,
    cancellation_token: CancellationToken,
}

impl Server {
    pub fn new(
        dispatcher: Dispatcher,
        settings: ServerConfig,
        cancellation_token: CancellationToken,
    ) -> Self {
        if settings.stateless {
            tracing::info!("Running stateless: no session ids will be issued");
        }
        Self {
            dispatcher: Arc::new(dispatcher),
            mcp_sessions: Arc::new(SessionManager::new()),
            settings,
            cancellation_token,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.mcp_sessions
    }

    pub fn stateless(&self) -> bool {
        self.settings.stateless
    }

    pub fn json_response(&self) -> bool {
        self.settings.json_response
    }

    /// Create a minimal Server for testing with the arithmetic catalog.
    #[cfg(test)]
    pub fn new_for_test() -> Arc<Self> {
        Self::for_test(ServerConfig::default())
    }

    #[cfg(test)]
    pub fn new_stateless_for_test() -> Arc<Self> {
        Self::for_test(ServerConfig {
            stateless: true,
            ..ServerConfig::default()
        })
    }

    #[cfg(test)]
    fn for_test(settings: ServerConfig) -> Arc<Self> {
        let dispatcher = crate::mcp::build_dispatcher(&settings.name)
            .expect("catalog should register cleanly");
        Arc::new(Self::new(dispatcher, settings, CancellationToken::new()))
    }

    pub fn routes(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/ready", get(ready))
            .route(
                &self.settings.path,
                axum::routing::post(handle_mcp_post)
                    .get(handle_mcp_get)
                    .delete(handle_mcp_delete),
            )
            .with_state(self.clone())
    }

    async fn serve_internal(self: Arc<Self>, listener: TcpListener, routes: Router) -> Result<()> {
        let token = self.cancellation_token.clone();

        tracing::info!(
            addr = ?listener.local_addr().ok(),
            path = %self.settings.path,
            "Starting HTTP server..."
        );
        axum::serve(listener, routes.into_make_service())
            .with_graceful_shutdown(async move {
                token.cancelled().await;
                tracing::info!("Cancellation token triggered, starting graceful shutdown");
            })
            .await?;

        tracing::info!(
            open_sessions = self.mcp_sessions.len(),
            "HTTP server stopped"
        );
        Ok(())
    }

    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let s = Arc::new(self);
        let routes = s.routes();
        s.serve_internal(listener, routes).await
    }
}

async fn ready() -> Json<Value> {
    Json(json!({ "ok": true }))
}
