//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring aggregation job. Cycles are serialized through the shared cycle
//! lock; a tick that fires while a cycle is still running skips instead of
//! overlapping it.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use droptrack_sync::CycleOptions;

use crate::api::AppState;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(state: AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let schedule = state.config.sync_schedule.clone();
    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            run_scheduled_cycle(state).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn run_scheduled_cycle(state: AppState) {
    let Ok(_guard) = state.cycle_lock.try_lock() else {
        tracing::warn!("previous sync cycle still running; skipping this tick");
        return;
    };

    tracing::info!("scheduler: starting sync cycle");
    let result = droptrack_sync::run_cycle(
        &state.pool,
        &state.config,
        &state.retailers,
        state.fetcher.as_ref(),
        &state.hub,
        "scheduler",
        &CycleOptions::default(),
    )
    .await;

    match result {
        Ok(outcome) => {
            tracing::info!(
                collected = outcome.collected,
                inserted = outcome.inserted,
                updated = outcome.updated,
                "scheduler: sync cycle complete"
            );
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "scheduler: sync cycle failed");
        }
    }
}
