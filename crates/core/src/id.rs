//! Strongly-typed identifiers used across the pipeline.
//!
//! Every identifier wraps a `u64`. The value `0` is reserved for "not yet
//! assigned" and is never a valid key; the validation rules reject it.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse an identifier from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {input:?}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub input: String,
}

/// Identifier of an order header (generated by the record store on save).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

/// Identifier of the ordering customer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(u64);

/// Identifier of the salesman credited with an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesmanId(u64);

/// Identifier of a catalog product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

/// Identifier of a warehouse holding stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(u64);

macro_rules! impl_numeric_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Smallest valid identifier (inclusive lower bound for range scans).
            pub const MIN: Self = Self(1);
            /// Largest identifier (inclusive upper bound for range scans).
            pub const MAX: Self = Self(u64::MAX);

            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            /// `false` for the reserved value `0`.
            pub const fn is_assigned(self) -> bool {
                self.0 != 0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $t {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for u64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| IdParseError {
                    kind: $name,
                    input: s.to_string(),
                })
            }
        }
    };
}

impl_numeric_id!(OrderId, "OrderId");
impl_numeric_id!(CustomerId, "CustomerId");
impl_numeric_id!(SalesmanId, "SalesmanId");
impl_numeric_id!(ProductId, "ProductId");
impl_numeric_id!(WarehouseId, "WarehouseId");
