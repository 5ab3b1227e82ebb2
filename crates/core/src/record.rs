//! Record trait: a keyed row held by a record-store collaborator.

/// A persistable record.
///
/// Records either carry a natural key (inventory rows keyed by product and
/// warehouse) or receive a generated key from the store on first save (order
/// headers). `key()` returns `None` until a generated key has been assigned.
pub trait Record: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Ordered key; range scans return records in ascending key order.
    type Key: Clone + Ord + core::fmt::Debug + Send + Sync + 'static;

    /// Entity name used in logs and violation paths (e.g. `"OrderItem"`).
    const ENTITY: &'static str;

    /// Current key, if the record has one.
    fn key(&self) -> Option<Self::Key>;

    /// Install a store-generated key and return it.
    ///
    /// Records with natural keys ignore `generated` and return their own key.
    fn assign_key(&mut self, generated: u64) -> Self::Key;
}
