//! Post-commit event notification port.
//!
//! The service publishes through this trait strictly after a store
//! transaction commits, which keeps the transactional boundary and the
//! notification boundary visibly separate. Delivery is at-most-once and
//! best-effort: implementations must not block the mutation path, and a
//! failed publication never rolls anything back.

use trellis_model::TaskEvent;
use uuid::Uuid;

/// Fan-out sink for committed mutations.
///
/// `origin` is the connection id of the session that performed the
/// mutation; implementations exclude it from delivery so a client never
/// receives an echo of its own action.
pub trait TaskNotifier: Send + Sync {
    fn publish(&self, event: TaskEvent, origin: Option<Uuid>);
}

/// Discards every event. Used where no transport is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl TaskNotifier for NoopNotifier {
    fn publish(&self, _event: TaskEvent, _origin: Option<Uuid>) {}
}
