//! Manifest renderers.

use std::fmt::Write as _;

use thiserror::Error;

use super::manifest::ShipmentManifest;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Turns a manifest into document bytes.
pub trait DocumentRenderer: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    fn render(&self, manifest: &ShipmentManifest) -> Result<Vec<u8>, RenderError>;
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, manifest: &ShipmentManifest) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec_pretty(manifest)?)
    }
}

/// Fixed-width packing slip.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl DocumentRenderer for PlainTextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn render(&self, m: &ShipmentManifest) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        writeln!(out, "SHIPMENT MANIFEST {}", m.manifest_id)?;
        writeln!(out, "order:    {}", m.order_id)?;
        writeln!(out, "customer: {}", m.customer_id)?;
        writeln!(out, "salesman: {}", m.salesman_id)?;
        writeln!(out, "ordered:  {}", m.order_date.to_rfc3339())?;
        writeln!(out)?;
        writeln!(out, "{:>4}  {:<24} {:>6} {:>10} {:>12}", "line", "product", "qty", "unit", "total")?;
        for line in &m.lines {
            let product = line
                .product_name
                .clone()
                .unwrap_or_else(|| format!("#{}", line.product_id));
            writeln!(
                out,
                "{:>4}  {:<24} {:>6} {:>10} {:>12}",
                line.item_id, product, line.quantity, line.unit_price, line.line_total
            )?;
        }
        writeln!(out)?;
        writeln!(out, "units: {}  value: {}", m.total_units, m.total_value)?;
        Ok(out.into_bytes())
    }
}
