//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::{ServiceConfig, StorageConfig};
use crate::error::{ServiceError, ServiceResult};
use customs_agents::HttpAgentInvoker;
use customs_engine::{ConversationOrchestrator, TracingNotifier};
use customs_storage::{CustomsStorage, InMemoryCustomsStorage};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Customs classification server
pub struct Server {
    config: ServiceConfig,
    orchestrator: Arc<ConversationOrchestrator>,
}

impl Server {
    /// Wire storage, agents and the orchestrator from configuration
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let storage = build_storage(&config.storage).await?;
        let invoker = Arc::new(HttpAgentInvoker::new(config.agents.clone())?);

        let orchestrator = ConversationOrchestrator::new(storage, invoker)
            .with_notifier(Arc::new(TracingNotifier))
            .with_policy(config.policy.decision.clone())
            .with_weights(config.policy.confidence.clone())
            .with_max_rounds(config.policy.max_rounds);

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> ServiceResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(
            AppState::new(self.orchestrator.clone()),
            self.config.server.enable_cors,
        );

        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            %addr,
            agents = %self.config.agents.base_url,
            max_rounds = self.config.policy.max_rounds,
            "customsd listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServiceError::Server(e.to_string()))?;

        tracing::info!("customsd shutting down");
        Ok(())
    }
}

async fn build_storage(config: &StorageConfig) -> ServiceResult<Arc<dyn CustomsStorage>> {
    match config {
        StorageConfig::Memory => {
            tracing::warn!("using in-memory storage; checkpoints are lost on restart");
            Ok(Arc::new(InMemoryCustomsStorage::new()))
        }
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let storage = customs_storage::postgres::PostgresCustomsStorage::connect_with_options(
                url,
                *max_connections,
                *connect_timeout_secs,
            )
            .await?;
            tracing::info!(max_connections, "connected to postgres");
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => Err(ServiceError::Config(
            "postgres storage requires the `postgres` feature".into(),
        )),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
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
                tracing::error!("failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
