//! Change notifier port for post-commit event publication.

use crate::message::domain::StoreEvent;

/// Port for announcing committed state changes to downstream consumers.
///
/// Publication is fire-and-forget: the store calls `publish` strictly
/// after the owning transaction has committed, and a slow, failing, or
/// absent subscriber must never roll back or fail the mutation that
/// produced the event. Implementations therefore return nothing and must
/// not block on consumer progress.
pub trait ChangeNotifier: Send + Sync {
    /// Publishes one committed-change event.
    fn publish(&self, event: StoreEvent);
}
