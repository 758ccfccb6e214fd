//! papercode-pipeline: the scheduled ingestion flow
//!
//! Sequences the materializer and the dependency extractor over the catalog,
//! activity-archive and dependency datasets once per run. Steps are strictly
//! ordered and each is idempotent on re-run; the first failure aborts the
//! remainder and surfaces to the external scheduler, whose next run resumes
//! from wherever the existence probes leave off.

pub mod catalog;
pub mod sql;
pub mod staging;
pub mod tables;
pub mod transfer;

pub use staging::{Bucket, LINKS_FILE, PAPERS_FILE, stage_sources};
pub use tables::Datasets;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use papercode_core::{ProgressContext, RateLimiter};
use papercode_github::{DepTables, DependencyExtractor, RepoFetcher};
use papercode_warehouse::{Materializer, TableLookup, Warehouse, WriteMode};

use tables::{paper_repo_schema, paper_schema, repo_activity_schema, repo_names_schema};
use transfer::RegionTransfer;

/// Static parameters of one pipeline run, read from configuration at startup.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub bucket: Bucket,
    pub papers_dir: String,
    pub source_base_url: String,
    pub archive_source: String,
    pub datasets: Datasets,
    pub start_date: NaiveDate,
    pub transfer_settle: Duration,
    pub max_retries: u32,
}

/// The full daily flow: stage raw sources, then run the warehouse steps.
pub fn run(
    warehouse: &dyn Warehouse,
    fetcher: &dyn RepoFetcher,
    limiter: RateLimiter,
    params: &PipelineParams,
    progress: &ProgressContext,
    today: NaiveDate,
) -> Result<()> {
    log::info!("pipeline run for {today}");
    stage_sources(
        &params.bucket,
        &params.source_base_url,
        &params.papers_dir,
        params.max_retries,
    )
    .context("step 1: staging source files")?;
    run_warehouse_steps(warehouse, fetcher, limiter, params, progress, today)
}

/// Steps 2-8, operating only on the warehouse and already-staged objects.
pub fn run_warehouse_steps(
    warehouse: &dyn Warehouse,
    fetcher: &dyn RepoFetcher,
    limiter: RateLimiter,
    params: &PipelineParams,
    progress: &ProgressContext,
    today: NaiveDate,
) -> Result<()> {
    let yesterday = today.pred_opt().context("date underflow")?;
    let ds = &params.datasets;
    let materializer = Materializer::new(warehouse);

    // Step 2: catalog tables. The source is always a full dump, so the delta
    // path is the same read executed as a truncate-replace re-computation.
    let papers_dump = params
        .bucket
        .object_path(&format!("{}/{PAPERS_FILE}", params.papers_dir));
    let paper_sql = sql::paper_load(&papers_dump);
    materializer
        .materialize(
            &ds.paper(),
            &paper_schema(),
            &paper_sql,
            &paper_sql,
            WriteMode::Truncate,
        )
        .context("step 2: paper")?;

    let links_dump = params
        .bucket
        .object_path(&format!("{}/{LINKS_FILE}", params.papers_dir));
    let link_sql = sql::paper_repo_load(&links_dump);
    materializer
        .materialize(
            &ds.paper_repo(),
            &paper_repo_schema(),
            &link_sql,
            &link_sql,
            WriteMode::Truncate,
        )
        .context("step 2: paper_repo")?;

    // Step 3: activity-archive staging table. Delta appends yesterday's
    // partition; its anti-join keeps a mid-run restart from duplicating.
    let staging_id = ds.repo_activity_staging();
    let year_start =
        NaiveDate::from_ymd_opt(yesterday.year(), 1, 1).context("year start out of range")?;
    materializer
        .materialize(
            &staging_id,
            &repo_activity_schema(),
            &sql::activity_populate(&params.archive_source, year_start),
            &sql::activity_delta(&params.archive_source, yesterday, &staging_id),
            WriteMode::Append,
        )
        .context("step 3: activity archive")?;

    // Step 4: reshaping job for the repository-name analytic table
    let names_sql = sql::repo_names(&ds.paper(), &ds.paper_repo(), params.start_date);
    materializer
        .materialize(
            &ds.repo_names(),
            &repo_names_schema(),
            &names_sql,
            &names_sql,
            WriteMode::Truncate,
        )
        .context("step 4: repo_names")?;

    // Step 5: dependency extraction. Window selection uses the same
    // existence probe as the materializer: first run covers the full range,
    // later runs only yesterday (the anti-join recovers stragglers).
    let deps_id = ds.paper_repo_deps();
    let (date_from, date_to) = match warehouse.lookup_table(&deps_id)? {
        TableLookup::Absent => (params.start_date, yesterday),
        TableLookup::Found => (yesterday, yesterday),
    };
    let dep_tables = DepTables {
        paper: ds.paper(),
        paper_repo: ds.paper_repo(),
        deps: deps_id,
    };
    DependencyExtractor::new(warehouse, fetcher, limiter, dep_tables)
        .extract(date_from, date_to, progress)
        .context("step 5: dependency extraction")?;

    // Step 6: cross-region copy of the activity data
    RegionTransfer {
        source: ds.repo_activity_staging(),
        destination: ds.repo_activity_copy(),
        settle: params.transfer_settle,
    }
    .run(warehouse)
    .context("step 6: cross-region transfer")?;

    // Step 7: final joined activity-for-papers table
    let activity_sql = sql::paper_repo_activity(&ds.repo_activity_copy(), &ds.repo_names());
    materializer
        .materialize(
            &ds.paper_repo_activity(),
            &repo_activity_schema(),
            &activity_sql,
            &activity_sql,
            WriteMode::Truncate,
        )
        .context("step 7: paper_repo_activity")?;

    // Step 8: drop the intermediate activity tables
    warehouse
        .delete_table(&ds.repo_activity_staging())
        .context("step 8: dropping activity staging table")?;
    warehouse
        .delete_table(&ds.repo_activity_copy())
        .context("step 8: dropping activity copy")?;

    log::info!("pipeline run complete");
    Ok(())
}
