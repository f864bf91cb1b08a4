use std::{future::Future, sync::LazyLock, time::Duration};

use herald_api::{ApiConfig, ApiServer, AppState};
use herald_common::{Signal, internal, logging, tracing};
use herald_delivery::{DeliveryConfig, DeliveryWorker, TransportConfig};
use herald_queue::QueueConfig;
use ron::extensions::Extensions;
use serde::Deserialize;
use tokio::sync::broadcast;

const fn default_shutdown_timeout() -> u64 {
    30
}

/// Top-level configuration, and the controller for everything it describes
#[derive(Debug, Deserialize)]
pub struct Herald {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// How long to wait for the delivery worker to finish on shutdown (in seconds)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for Herald {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            queue: QueueConfig::default(),
            transport: TransportConfig::default(),
            delivery: DeliveryConfig::default(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    Ok(())
}

impl Herald {
    /// Parse a RON configuration
    ///
    /// Newtype variants may be written without their inner parentheses and
    /// optional values without `Some(..)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is not a valid configuration.
    pub fn from_ron(config: &str) -> anyhow::Result<Self> {
        let options = ron::Options::default().with_default_extension(
            Extensions::UNWRAP_VARIANT_NEWTYPES | Extensions::IMPLICIT_SOME,
        );

        Ok(options.from_str(config)?)
    }

    /// Run until Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the queue, transport or API server cannot be set
    /// up, if the API server fails, or if the worker does not stop in time.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();

        self.run_until(shutdown_signal(), &SHUTDOWN_BROADCAST).await
    }

    /// Run until `shutdown` resolves, announcing the shutdown on `broadcast`
    ///
    /// # Errors
    ///
    /// See [`Herald::run`].
    pub async fn run_until<F>(
        self,
        shutdown: F,
        broadcast: &broadcast::Sender<Signal>,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        let store = self.queue.into_store().await?;
        let transport = self.transport.into_transport()?;

        let worker = DeliveryWorker::new(store.clone(), transport, self.delivery).spawn();

        let server = match ApiServer::new(
            &self.api,
            AppState {
                store,
                waker: worker.waker(),
                page_size: self.api.page_size,
            },
        )
        .await
        {
            Ok(server) => server,
            Err(e) => {
                worker.stop().await;
                return Err(e.into());
            }
        };

        let mut api = tokio::spawn(server.serve(broadcast.subscribe()));

        internal!(level = INFO, "Controller running");

        let mut ret = tokio::select! {
            served = &mut api => {
                internal!(level = ERROR, "API server exited unexpectedly");
                Some(served)
            }
            signalled = shutdown => {
                if let Err(e) = signalled {
                    tracing::error!(error = %e, "Failed to wait for a shutdown signal");
                }
                None
            }
        };

        internal!("Shutting down...");
        let _ = broadcast.send(Signal::Shutdown);

        if ret.is_none() {
            ret = Some(api.await);
        }

        let timeout = Duration::from_secs(self.shutdown_timeout_secs);
        let stopped = tokio::time::timeout(timeout, worker.stop()).await;
        let _ = broadcast.send(Signal::Finalised);

        if stopped.is_err() {
            tracing::error!(?timeout, "Delivery worker did not stop in time");
            anyhow::bail!("Delivery worker did not stop within {timeout:?}");
        }

        match ret {
            Some(Ok(served)) => served?,
            Some(Err(join)) => anyhow::bail!("API server task failed: {join}"),
            None => {}
        }

        internal!(level = INFO, "Shutdown complete");
        Ok(())
    }
}
