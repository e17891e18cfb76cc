//! Background upkeep: the task retention sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use trellis_core::database::ports::TaskStore;

/// Periodically delete tasks older than `retention`.
///
/// The sweep runs outside the request path and outside the transactional
/// core: it publishes no events, and a failed pass is retried on the next
/// tick.
pub fn spawn_retention_sweep(
    store: Arc<dyn TaskStore>,
    retention: chrono::Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - retention;
            match store.delete_created_before(cutoff).await {
                Ok(0) => {}
                Ok(deleted) => {
                    info!(deleted, %cutoff, "retention sweep removed old tasks");
                }
                Err(err) => {
                    warn!(error = %err, "retention sweep failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::testing::{InMemoryTaskStore, test_user};
    use trellis_model::{NewTask, TaskPriority, TaskStatus};

    #[tokio::test]
    async fn sweep_deletes_only_tasks_past_the_cutoff() {
        let store = Arc::new(InMemoryTaskStore::default());
        let user = test_user("ana", false);

        store
            .append(
                user.id,
                &NewTask {
                    title: "fresh".into(),
                    description: None,
                    status: TaskStatus::Pending,
                    priority: TaskPriority::Medium,
                },
            )
            .await
            .unwrap();

        // Everything in the store was created just now, so a cutoff in the
        // past removes nothing...
        let removed = store
            .delete_created_before(Utc::now() - chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        // ...and a future cutoff removes the lot.
        let removed = store
            .delete_created_before(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
