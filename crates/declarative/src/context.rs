//! Gateway and progress traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific transport or UI.

use crate::entry::{Collection, Entry};
use crate::error::GatewayResult;
use crate::types::ApplyResult;

/// Remote operations on the members of one parent resource's collection
///
/// Every call returns only once the remote change is durably complete or has
/// failed, including any job polling the remote requires. Implementations
/// report an absent sub-resource as [`crate::GatewayError::NotFound`].
pub trait SubResourceGateway<E: Entry> {
    /// Create one entry, returning the remote's canonical form of it
    fn create(&self, entry: &E) -> GatewayResult<E>;

    /// Replace the attributes of the entry at `key`
    fn update(&self, key: &E::Key, attributes: &E::Attributes) -> GatewayResult<()>;

    /// Remove the entry at `key`
    fn delete(&self, key: &E::Key) -> GatewayResult<()>;

    /// Read the remote collection
    ///
    /// Returns `Ok(None)` when the gateway cannot list; the apply driver
    /// then trusts its own bookkeeping.
    fn list(&self) -> GatewayResult<Option<Collection<E>>> {
        Ok(None)
    }
}

impl<E: Entry, G: SubResourceGateway<E> + ?Sized> SubResourceGateway<E> for &G {
    fn create(&self, entry: &E) -> GatewayResult<E> {
        (**self).create(entry)
    }

    fn update(&self, key: &E::Key, attributes: &E::Attributes) -> GatewayResult<()> {
        (**self).update(key, attributes)
    }

    fn delete(&self, key: &E::Key) -> GatewayResult<()> {
        (**self).delete(key)
    }

    fn list(&self) -> GatewayResult<Option<Collection<E>>> {
        (**self).list()
    }
}

/// Progress callback for apply cycles
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called before the first operation of a non-empty plan
    fn on_cycle_start(&mut self, operations: usize);

    /// Called when starting a single operation
    fn on_operation_start(&mut self, description: &str);

    /// Called when an operation completes
    fn on_operation_complete(&mut self, description: &str, result: &ApplyResult);

    /// Called when the cycle ends, successfully or not
    fn on_cycle_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_cycle_start(&mut self, _operations: usize) {}
    fn on_operation_start(&mut self, _description: &str) {}
    fn on_operation_complete(&mut self, _description: &str, _result: &ApplyResult) {}
    fn on_cycle_complete(&mut self) {}
}
