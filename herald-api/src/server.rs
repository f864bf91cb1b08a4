//! Mailing API HTTP server

use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use herald_common::Signal;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{
    ApiConfig, ApiError,
    handlers::{AppState, create_mailing, get_mailing, list_mailings},
};

/// Build the mailing routes over `state`
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/mailing", post(create_mailing).get(list_mailings))
        .route("/mailing/{id}", get(get_mailing))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
}

/// Mailing API HTTP server
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Bind the API server
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the configured address fails.
    pub async fn new(config: &ApiConfig, state: AppState) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| ApiError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "API server bound successfully"
        );

        let router = router(
            AppState {
                page_size: config.page_size.max(1),
                ..state
            },
            Duration::from_secs(config.request_timeout_secs),
        );

        Ok(Self { listener, router })
    }

    /// Address the server is listening on
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ApiError> {
        self.listener
            .local_addr()
            .map_err(|e| ApiError::ServerError(e.to_string()))
    }

    /// Run the API server until a shutdown signal is received
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), ApiError> {
        tracing::info!("API server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("API server received shutdown signal");
            })
            .await
            .map_err(|e| ApiError::ServerError(e.to_string()))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiServer")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}
