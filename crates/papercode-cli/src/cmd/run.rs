//! `papercode run` - one scheduled invocation of the daily pipeline

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;

use papercode_core::{ProgressContext, RateLimiter};
use papercode_github::GithubClient;
use papercode_pipeline::{Bucket, Datasets, PipelineParams};
use papercode_warehouse::DuckWarehouse;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run as-of this date instead of today (delta windows derive from it)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Skip staging the raw source files (reuse already-staged objects)
    #[arg(long)]
    pub no_stage: bool,
}

pub fn run(args: RunArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let warehouse = DuckWarehouse::open(&config.warehouse.path)?;
    warehouse
        .ensure_dataset(&config.warehouse.catalog_dataset)
        .context("creating catalog dataset")?;
    warehouse
        .ensure_dataset(&config.warehouse.archive_dataset)
        .context("creating archive dataset")?;

    let fetcher = GithubClient::new(
        &config.github.api_url,
        config.github.token.clone(),
        config.github.max_retries,
    );
    if config.github.token.is_none() {
        log::warn!("no GitHub token configured; unauthenticated quota applies");
    }

    let limiter = RateLimiter::new(
        config.throttle.max_requests,
        Duration::from_secs(config.throttle.interval_secs),
    );

    let params = PipelineParams {
        bucket: Bucket::new(&config.storage.root, &config.storage.bucket),
        papers_dir: config.storage.papers_dir.clone(),
        source_base_url: config.source.base_url.clone(),
        archive_source: config.warehouse.archive_source.clone(),
        datasets: Datasets {
            catalog: config.warehouse.catalog_dataset.clone(),
            archive: config.warehouse.archive_dataset.clone(),
        },
        start_date: config.pipeline.start_date,
        transfer_settle: Duration::from_secs(config.pipeline.transfer_settle_secs),
        max_retries: config.github.max_retries,
    };

    let today = args.date.unwrap_or_else(|| Utc::now().date_naive());

    if args.no_stage {
        papercode_pipeline::run_warehouse_steps(
            &warehouse, &fetcher, limiter, &params, progress, today,
        )
    } else {
        papercode_pipeline::run(&warehouse, &fetcher, limiter, &params, progress, today)
    }
}
