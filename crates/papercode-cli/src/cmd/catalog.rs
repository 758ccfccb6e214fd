//! `papercode catalog` - weekly catalog staging flow

use anyhow::Result;
use clap::Args;

use papercode_pipeline::Bucket;
use papercode_pipeline::catalog::stage_catalog;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Items requested per API page
    #[arg(long)]
    pub per_page: Option<u32>,
}

pub fn run(args: CatalogArgs, config: &Config) -> Result<()> {
    let bucket = Bucket::new(&config.storage.root, &config.storage.bucket);
    stage_catalog(
        &bucket,
        &config.source.api_url,
        &config.storage.papers_dir,
        args.per_page.unwrap_or(config.source.items_per_page),
        config.github.max_retries,
    )
}
