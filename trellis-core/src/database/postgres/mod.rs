//! PostgreSQL adapters for the repository ports.

mod tasks;
mod users;

pub use tasks::PostgresTaskStore;
pub use users::PostgresUserStore;

/// Bound on how long a mutation transaction may wait on row locks before
/// surfacing `Conflict` to the caller. Applied with `SET LOCAL`, so it
/// scopes to the transaction.
pub(crate) const LOCK_TIMEOUT: &str = "SET LOCAL lock_timeout = '5s'";
