//! Seeds stores, pushes the fixture's orders through a pipeline, and
//! collects what happened.

use std::sync::Arc;
use std::thread;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use orderflow_core::{FulfillmentError, OrderId};
use orderflow_infra::documents::{DocumentRenderer, JsonRenderer, PlainTextRenderer, ShipmentDocument};
use orderflow_infra::fanout::FanoutStats;
use orderflow_infra::intake::{IntakeStats, OrderLifecycle};
use orderflow_infra::{FulfillmentPipeline, InMemoryStores, PipelineConfig};
use orderflow_inventory::InventoryRecord;
use orderflow_sales::{OrderHeader, OrderItem, OrderRequest};

use crate::fixture::Fixture;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ManifestFormat {
    #[default]
    Json,
    Text,
}

impl ManifestFormat {
    fn renderer(self) -> Arc<dyn DocumentRenderer> {
        match self {
            ManifestFormat::Json => Arc::new(JsonRenderer),
            ManifestFormat::Text => Arc::new(PlainTextRenderer),
        }
    }
}

/// What one submitted order turned into.
#[derive(Debug, Clone, Serialize)]
pub struct OrderOutcome {
    pub sequence: u64,
    pub caller: usize,
    pub request: OrderRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<OrderHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FulfillmentError>,
    pub lifecycle: Option<OrderLifecycle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub order_id: OrderId,
    pub content_type: String,
    /// Parsed JSON for JSON manifests, the text itself otherwise.
    pub document: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: PipelineConfig,
    pub orders: Vec<OrderOutcome>,
    pub items: Vec<OrderItem>,
    pub inventory: Vec<InventoryRecord>,
    pub manifests: Vec<Manifest>,
    pub intake: IntakeStats,
    pub fanout: FanoutStats,
}

/// Run every fixture order through a fresh pipeline and drain it.
///
/// Orders are dealt round-robin to `callers` threads that submit concurrently;
/// with one caller the submission order is the fixture order.
pub fn run(
    fixture: Fixture,
    config: PipelineConfig,
    callers: usize,
    format: ManifestFormat,
) -> anyhow::Result<Report> {
    let stores = InMemoryStores::seeded(fixture.products, fixture.inventory)
        .context("seeding record stores")?;
    let pipeline = FulfillmentPipeline::start(
        config.clone(),
        stores.order_stores(),
        stores.documents(),
        format.renderer(),
    )
    .context("starting pipeline")?;

    let callers = callers.max(1);
    let mut lanes: Vec<Vec<OrderRequest>> = vec![Vec::new(); callers];
    for (idx, order) in fixture.orders.into_iter().enumerate() {
        lanes[idx % callers].push(order);
    }

    let submitted = thread::scope(|s| {
        let handles: Vec<_> = lanes
            .into_iter()
            .enumerate()
            .map(|(caller, lane)| {
                let pipeline = &pipeline;
                s.spawn(move || submit_lane(pipeline, caller, lane))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("caller thread panicked"))?)
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    pipeline.shutdown();

    let mut orders: Vec<OrderOutcome> = submitted.into_iter().flatten().collect();
    orders.sort_by_key(|o| o.sequence);
    for outcome in &mut orders {
        outcome.lifecycle = pipeline.lifecycle(outcome.sequence);
    }

    let manifests = stores
        .documents
        .snapshot()
        .into_iter()
        .map(manifest_view)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let report = Report {
        config,
        orders,
        items: stores.items.snapshot(),
        inventory: stores.inventory.snapshot(),
        manifests,
        intake: pipeline.intake_stats(),
        fanout: pipeline.fanout_stats(),
    };

    info!(
        orders = report.orders.len(),
        committed = report.intake.committed,
        rejected = report.intake.rejected,
        manifests = report.manifests.len(),
        "harness run finished"
    );
    Ok(report)
}

fn submit_lane(
    pipeline: &FulfillmentPipeline,
    caller: usize,
    lane: Vec<OrderRequest>,
) -> anyhow::Result<Vec<OrderOutcome>> {
    let mut pending = Vec::with_capacity(lane.len());
    for request in lane {
        let handle = pipeline
            .submit(request.clone())
            .with_context(|| format!("caller {caller} submitting order"))?;
        pending.push((request, handle));
    }

    Ok(pending
        .into_iter()
        .map(|(request, handle)| {
            let sequence = handle.sequence();
            let (header, error) = match handle.wait() {
                Ok(h) => (Some(h), None),
                Err(e) => (None, Some(e)),
            };
            OrderOutcome {
                sequence,
                caller,
                request,
                header,
                error,
                lifecycle: None,
            }
        })
        .collect())
}

fn manifest_view(doc: ShipmentDocument) -> anyhow::Result<Manifest> {
    let document = if doc.content_type == JsonRenderer.content_type() {
        serde_json::from_slice(&doc.bytes)
            .with_context(|| format!("decoding manifest for order {}", doc.order_id))?
    } else {
        serde_json::Value::String(String::from_utf8_lossy(&doc.bytes).into_owned())
    };

    Ok(Manifest {
        order_id: doc.order_id,
        content_type: doc.content_type,
        document,
    })
}
