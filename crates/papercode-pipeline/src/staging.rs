//! Object-store staging of the raw source dumps.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use papercode_core::{StreamError, download_to_file, retry_with_backoff};

/// The two fixed source files published by the catalog.
pub const PAPERS_FILE: &str = "papers-with-abstracts.json.gz";
pub const LINKS_FILE: &str = "links-between-papers-and-code.json.gz";

/// Write-only object store addressed by bucket + path, backed by a local
/// root directory (the lake mount).
#[derive(Debug, Clone)]
pub struct Bucket {
    root: PathBuf,
    name: String,
}

impl Bucket {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// Filesystem path of an object; also what the query engine reads.
    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(&self.name).join(key)
    }

    /// Download `url` into the object at `key`, staging through a `.tmp`
    /// sibling so a partial download never shadows a previous good object.
    pub fn put_from_url(&self, url: &str, key: &str) -> Result<u64, StreamError> {
        let dest = self.object_path(key);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = dest.with_extension("tmp");
        let written = download_to_file(url, &tmp)?;
        std::fs::rename(&tmp, &dest)?;
        Ok(written)
    }
}

/// Step 1: fetch both source dumps into the bucket.
pub fn stage_sources(
    bucket: &Bucket,
    base_url: &str,
    dest_dir: &str,
    max_retries: u32,
) -> Result<()> {
    for filename in [PAPERS_FILE, LINKS_FILE] {
        let url = format!("{base_url}/{filename}");
        let key = format!("{dest_dir}/{filename}");
        let written = retry_with_backoff(filename, max_retries, || {
            bucket.put_from_url(&url, &key)
        })
        .with_context(|| format!("failed to stage {filename}"))?;
        log::info!("staged {filename} ({written} bytes)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_is_bucket_qualified() {
        let bucket = Bucket::new("/lake", "papercode");
        assert_eq!(
            bucket.object_path("papers_and_code/papers.json.gz"),
            PathBuf::from("/lake/papercode/papers_and_code/papers.json.gz")
        );
    }

    #[test]
    fn source_filenames_fixed() {
        assert_eq!(PAPERS_FILE, "papers-with-abstracts.json.gz");
        assert_eq!(LINKS_FILE, "links-between-papers-and-code.json.gz");
    }
}
