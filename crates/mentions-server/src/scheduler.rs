//! Background job scheduler.
//!
//! Registers the recurring aggregation cycle on the configured cron schedule.

use std::sync::Arc;

use mentions_aggregator::Aggregator;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(
    aggregator: Arc<Aggregator>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_cycle_job(&scheduler, aggregator, cron).await?;
    scheduler.start().await?;
    tracing::info!(cron, "scheduler: aggregation cycle job registered");
    Ok(scheduler)
}

async fn register_cycle_job(
    scheduler: &JobScheduler,
    aggregator: Arc<Aggregator>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let aggregator = Arc::clone(&aggregator);

        Box::pin(async move {
            tracing::info!("scheduler: starting aggregation cycle");
            if aggregator.run_now().await {
                tracing::info!("scheduler: aggregation cycle complete");
            } else {
                tracing::info!("scheduler: previous cycle still running; tick skipped");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
