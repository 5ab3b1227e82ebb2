//! End-to-end wiring: intake → builder → observers → fan-out.
//!
//! ```text
//! submit ─▶ IntakeQueue ─▶ OrderAggregateBuilder ─▶ CommitObservable ─┬─▶ observers
//!                                                                    └─▶ NotificationFanout ─▶ ShipmentManifestTask
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use orderflow_core::RecordStore;
use orderflow_events::{CommitObservable, CommitObserver};
use orderflow_sales::{OrderAggregateBuilder, OrderHeader, OrderRequest, OrderRules, OrderStores};

use crate::config::{ConfigError, PipelineConfig};
use crate::documents::{DocumentRenderer, ShipmentDocument};
use crate::fanout::{
    FanoutConfig, FanoutStats, FanoutTask, NotificationFanout, ShipmentManifestTask,
};
use crate::intake::{IntakeError, IntakeQueue, IntakeStats, OrderLifecycle, PendingOrder};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

/// A running fulfillment pipeline.
pub struct FulfillmentPipeline {
    config: PipelineConfig,
    builder: Arc<OrderAggregateBuilder>,
    observable: Arc<CommitObservable<OrderHeader>>,
    fanout: Arc<NotificationFanout<OrderHeader>>,
    intake: IntakeQueue,
}

impl FulfillmentPipeline {
    /// Start workers for `config` with the standard order rules.
    pub fn start(
        config: PipelineConfig,
        stores: OrderStores,
        documents: Arc<dyn RecordStore<ShipmentDocument>>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Result<Self, PipelineError> {
        Self::start_with_rules(config, stores, documents, renderer, OrderRules::standard())
    }

    pub fn start_with_rules(
        config: PipelineConfig,
        stores: OrderStores,
        documents: Arc<dyn RecordStore<ShipmentDocument>>,
        renderer: Arc<dyn DocumentRenderer>,
        rules: OrderRules,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let manifest_task: Arc<dyn FanoutTask<OrderHeader>> = Arc::new(ShipmentManifestTask::new(
            stores.items.clone(),
            stores.products.clone(),
            documents,
            renderer,
        ));
        let fanout: Arc<NotificationFanout<OrderHeader>> = Arc::new(NotificationFanout::spawn(
            FanoutConfig::default()
                .with_workers(config.fanout_workers)
                .with_name(format!("{}-fanout", config.name)),
            manifest_task,
        ));

        let observable: Arc<CommitObservable<OrderHeader>> = Arc::new(CommitObservable::new());
        observable.register(fanout.clone());

        let builder = Arc::new(
            OrderAggregateBuilder::new(stores)
                .with_rules(rules)
                .with_compensation(config.compensation),
        );

        let intake = IntakeQueue::spawn(
            &format!("{}-intake", config.name),
            config.intake_shape,
            config.intake_capacity,
            builder.clone(),
            observable.clone(),
        )?
        .with_lifecycle_retention(config.lifecycle_retention);

        info!(
            pipeline = %config.name,
            shape = %config.intake_shape,
            capacity = config.intake_capacity,
            fanout_workers = config.fanout_workers,
            compensation = ?config.compensation,
            lifecycle_retention = config.lifecycle_retention,
            "fulfillment pipeline started"
        );

        Ok(Self {
            config,
            builder,
            observable,
            fanout,
            intake,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn builder(&self) -> &OrderAggregateBuilder {
        &self.builder
    }

    pub fn submit(&self, request: OrderRequest) -> Result<PendingOrder, IntakeError> {
        self.intake.submit(request)
    }

    /// Add an observer after the fan-out. Returns `false` if already registered.
    pub fn register_observer(&self, observer: Arc<dyn CommitObserver<OrderHeader>>) -> bool {
        self.observable.register(observer)
    }

    /// Drain intake first so its last notifications still reach the fan-out,
    /// then drain the fan-out.
    pub fn shutdown(&self) {
        self.intake.shutdown();
        self.fanout.shutdown();
        info!(pipeline = %self.config.name, "fulfillment pipeline stopped");
    }

    pub fn intake_stats(&self) -> IntakeStats {
        self.intake.stats()
    }

    pub fn fanout_stats(&self) -> FanoutStats {
        self.fanout.stats()
    }

    pub fn lifecycle(&self, sequence: u64) -> Option<OrderLifecycle> {
        self.intake.lifecycle(sequence)
    }

    pub fn outstanding(&self) -> Vec<u64> {
        self.intake.outstanding()
    }
}

impl core::fmt::Debug for FulfillmentPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FulfillmentPipeline")
            .field("config", &self.config)
            .field("intake", &self.intake)
            .field("fanout", &self.fanout)
            .finish()
    }
}
