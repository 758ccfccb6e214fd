//! Weekly catalog staging: page through the catalog REST API and land each
//! resource as a JSON-lines object in the bucket.

use std::io::Write;

use anyhow::{Context, Result};
use papercode_core::{Retryable, StreamError, fetch_text, retry_with_backoff};
use serde::Deserialize;

use crate::staging::Bucket;

/// Resources fetched from the catalog API each run.
pub const CATALOG_RESOURCES: &[&str] = &["tasks", "areas", "repositories", "papers", "methods"];

#[derive(Debug)]
enum CatalogError {
    Stream(StreamError),
    Parse(serde_json::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "bad page JSON: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Stream(e) => e.is_retryable(),
            Self::Parse(_) => false,
        }
    }
}

/// One page of a paginated resource listing.
#[derive(Debug, Deserialize)]
struct ResourcePage {
    results: Vec<serde_json::Value>,
    next: Option<String>,
}

/// Fetch every page of one resource, following `next` links.
fn fetch_resource(
    api_url: &str,
    resource: &str,
    per_page: u32,
) -> Result<Vec<serde_json::Value>, CatalogError> {
    let mut page_url = format!("{api_url}/{resource}/?items_per_page={per_page}&page=1");
    let mut results = Vec::new();
    loop {
        let body = fetch_text(&page_url).map_err(CatalogError::Stream)?;
        let page: ResourcePage = serde_json::from_str(&body).map_err(CatalogError::Parse)?;
        results.extend(page.results);
        match page.next {
            Some(next) => page_url = next,
            None => break,
        }
    }
    Ok(results)
}

/// Stage every catalog resource into `{dest_dir}/{resource}.jsonl`.
pub fn stage_catalog(
    bucket: &Bucket,
    api_url: &str,
    dest_dir: &str,
    per_page: u32,
    max_retries: u32,
) -> Result<()> {
    for &resource in CATALOG_RESOURCES {
        let rows = retry_with_backoff(resource, max_retries, || {
            fetch_resource(api_url, resource, per_page)
        })
        .with_context(|| format!("failed to fetch catalog resource {resource}"))?;

        let dest = bucket.object_path(&format!("{dest_dir}/{resource}.jsonl"));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::io::BufWriter::new(
            std::fs::File::create(&dest)
                .with_context(|| format!("cannot create {}", dest.display()))?,
        );
        for row in &rows {
            serde_json::to_writer(&mut file, row)?;
            file.write_all(b"\n")?;
        }
        file.flush()?;
        log::info!("staged {resource}: {} rows", rows.len());
    }
    Ok(())
}
