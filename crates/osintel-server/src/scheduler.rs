//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring collection job.

use std::sync::Arc;
use std::time::Duration;

use osintel_collect::CollectorRegistry;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    registry: Arc<CollectorRegistry>,
    config: Arc<osintel_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_collection_job(&scheduler, pool, registry, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring collection sweep.
///
/// Runs every `collection_interval_secs` (default five minutes). Each pass
/// collects from every enabled source whose own check interval has elapsed.
async fn register_collection_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    registry: Arc<CollectorRegistry>,
    config: Arc<osintel_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let interval = Duration::from_secs(config.collection_interval_secs.max(1));

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let registry = Arc::clone(&registry);

        Box::pin(async move {
            tracing::info!("scheduler: starting collection sweep");
            run_collection_sweep(&pool, &registry).await;
            tracing::info!("scheduler: collection sweep complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Collect from all due sources; failures are logged per source.
async fn run_collection_sweep(pool: &PgPool, registry: &CollectorRegistry) {
    let sources = match osintel_db::list_due_sources(pool).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load due sources");
            return;
        }
    };

    if sources.is_empty() {
        tracing::debug!("scheduler: no sources due for collection");
        return;
    }

    tracing::info!(count = sources.len(), "scheduler: collecting due sources");

    for source in &sources {
        match collect_source(pool, registry, source).await {
            Ok(inserted) => {
                tracing::info!(
                    source_id = source.id,
                    source = %source.name,
                    inserted,
                    "scheduler: source collected"
                );
            }
            Err(e) => {
                tracing::error!(
                    source_id = source.id,
                    source = %source.name,
                    error = %e,
                    "scheduler: source collection failed"
                );
            }
        }
    }
}

/// Run one source's collector and persist its items.
///
/// Returns the number of newly inserted rows (duplicates are skipped by the
/// unique external-id index).
pub(crate) async fn collect_source(
    pool: &PgPool,
    registry: &CollectorRegistry,
    source: &osintel_db::DataSourceRow,
) -> anyhow::Result<u64> {
    let collector = registry.create(&source.source_type, &source.config)?;
    let items = collector.collect().await?;

    let mut inserted = 0;
    for item in &items {
        let row = osintel_db::insert_item(
            pool,
            source.id,
            &item.item_type,
            item.external_id.as_deref(),
            item.title.as_deref(),
            &item.content,
            &item.metadata,
            item.url.as_deref(),
            item.author.as_deref(),
            item.published_at,
        )
        .await?;
        if row.is_some() {
            inserted += 1;
        }
    }

    osintel_db::mark_source_checked(pool, source.id).await?;
    Ok(inserted)
}
