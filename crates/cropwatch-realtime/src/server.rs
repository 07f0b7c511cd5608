//! Top-level real-time engine that ties the subsystems together.

use std::sync::Arc;

use tracing::info;

use cropwatch_auth::identity::IdentityResolver;
use cropwatch_core::config::RealtimeConfig;

use crate::broker::FanoutBroker;
use crate::channel::registry::GroupRegistry;
use crate::connection::gateway::ConnectionGateway;
use crate::connection::handle::CloseReason;
use crate::metrics::RealtimeMetrics;

/// Central real-time engine shared with the HTTP layer.
#[derive(Debug, Clone)]
pub struct RealtimeEngine {
    /// Connection gateway.
    pub gateway: ConnectionGateway,
    /// Fanout broker.
    pub broker: FanoutBroker,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
}

impl RealtimeEngine {
    /// Creates an engine over an already constructed group registry.
    pub fn new(
        config: RealtimeConfig,
        resolver: IdentityResolver,
        registry: Arc<dyn GroupRegistry>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let broker = FanoutBroker::new(registry, metrics.clone());
        let gateway = ConnectionGateway::new(resolver, broker.clone(), metrics.clone(), config);

        info!("Real-time engine initialized");

        Self {
            gateway,
            broker,
            metrics,
        }
    }

    /// Asks every open connection to close with "going away".
    ///
    /// Each socket loop sends its close frame and unsubscribes on its own.
    pub fn shutdown(&self) -> usize {
        info!("Shutting down real-time engine");
        self.gateway.close_all(CloseReason::Shutdown)
    }
}
