//! Sequential, throttled dependency extraction.
//!
//! Crawls every (paper, repository) candidate lacking dependency rows,
//! fetches a manifest per repository, and appends the parsed tuples in
//! batches. Per-repository failures skip and continue; only warehouse
//! failures abort the run.
//!
//! Persistence is at-least-once, not exactly-once: a crash after a flush but
//! before the stream advances can re-insert the flushed rows on a naive
//! retry. Downstream consumers deduplicate.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use papercode_core::{ProgressContext, RateLimiter};
use papercode_warehouse::{Field, FieldType, Row, TableId, TableLookup, Value, Warehouse};

use crate::api::{FetchError, RepoFetcher};
use crate::manifest::MANIFEST_SOURCES;
use crate::repo_url::parse_repo_url;

/// Tuples are flushed to the warehouse every this many processed candidates.
const FLUSH_EVERY: usize = 100;

/// Source and destination tables for one extraction run.
#[derive(Debug, Clone)]
pub struct DepTables {
    pub paper: TableId,
    pub paper_repo: TableId,
    pub deps: TableId,
}

/// Destination schema: one row per discovered dependency.
pub fn deps_schema() -> Vec<Field> {
    vec![
        Field::required("paper_url", FieldType::String),
        Field::required("repo_url", FieldType::String),
        Field::required("repo_dep", FieldType::String),
    ]
}

/// Candidate query: GitHub-linked repositories for papers in the window,
/// left-anti-joined against repositories that already have dependency rows.
fn candidates_sql(tables: &DepTables, date_from: NaiveDate, date_to: NaiveDate) -> String {
    format!(
        "SELECT pr.paper_url, pr.repo_url \
         FROM {paper_repo} pr \
         JOIN {paper} p ON p.paper_url = pr.paper_url \
         LEFT JOIN {deps} prd ON pr.repo_url = prd.repo_url \
         WHERE p.date BETWEEN '{date_from}' AND '{date_to}' \
         AND pr.repo_url LIKE 'https://github.com/%' \
         AND prd.repo_url IS NULL",
        paper_repo = tables.paper_repo,
        paper = tables.paper,
        deps = tables.deps,
    )
}

/// Counters reported after one extraction run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub candidates: usize,
    pub extracted_repos: usize,
    pub skipped_malformed: usize,
    pub skipped_no_manifest: usize,
    pub rows_written: usize,
    pub flushes: usize,
}

/// Why one candidate produced no rows.
enum Skip {
    MalformedUrl,
    NoManifest,
}

pub struct DependencyExtractor<'a> {
    warehouse: &'a dyn Warehouse,
    fetcher: &'a dyn RepoFetcher,
    limiter: RateLimiter,
    tables: DepTables,
    flush_every: usize,
}

impl<'a> DependencyExtractor<'a> {
    pub fn new(
        warehouse: &'a dyn Warehouse,
        fetcher: &'a dyn RepoFetcher,
        limiter: RateLimiter,
        tables: DepTables,
    ) -> Self {
        Self {
            warehouse,
            fetcher,
            limiter,
            tables,
            flush_every: FLUSH_EVERY,
        }
    }

    /// Override the flush cadence (tests exercise the batching boundary).
    pub fn with_flush_every(mut self, n: usize) -> Self {
        assert!(n > 0, "flush cadence must be positive");
        self.flush_every = n;
        self
    }

    /// Crawl all candidates with papers published in `[date_from, date_to]`
    /// and append their dependency tuples.
    pub fn extract(
        &mut self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        progress: &ProgressContext,
    ) -> Result<ExtractSummary> {
        let deps_id = self.tables.deps.clone();
        if self.warehouse.lookup_table(&deps_id)? == TableLookup::Absent {
            log::info!("{deps_id}: absent, creating");
            self.warehouse.create_table(&deps_id, &deps_schema())?;
        }

        let sql = candidates_sql(&self.tables, date_from, date_to);
        let candidates = self
            .warehouse
            .fetch_rows(&sql)
            .context("candidate query failed")?;

        let mut summary = ExtractSummary {
            candidates: candidates.len(),
            ..Default::default()
        };
        log::info!(
            "extracting dependencies for {} candidate repositories ({date_from}..{date_to})",
            candidates.len()
        );

        let pb = progress.crawl_bar(candidates.len() as u64);
        let mut batch: Vec<Row> = Vec::new();

        for (idx, candidate) in candidates.iter().enumerate() {
            let (paper_url, repo_url) = match (candidate[0].as_str(), candidate[1].as_str()) {
                (Some(p), Some(r)) => (p, r),
                _ => {
                    log::warn!("candidate row {idx} has non-string keys, skipping");
                    summary.skipped_malformed += 1;
                    continue;
                }
            };
            pb.set_message(repo_url.to_string());

            match self.crawl_one(repo_url) {
                Ok(deps) => {
                    if !deps.is_empty() {
                        summary.extracted_repos += 1;
                    }
                    for dep in deps {
                        batch.push(vec![
                            Value::from(paper_url),
                            Value::from(repo_url),
                            Value::from(dep),
                        ]);
                    }
                }
                Err(Skip::MalformedUrl) => summary.skipped_malformed += 1,
                Err(Skip::NoManifest) => summary.skipped_no_manifest += 1,
            }
            pb.inc(1);

            if (idx + 1) % self.flush_every == 0 {
                self.flush(&deps_id, &mut batch, &mut summary)?;
            }
        }

        self.flush(&deps_id, &mut batch, &mut summary)?;
        pb.finish_and_clear();

        log::info!(
            "extraction done: {} candidates, {} with dependencies, {} rows, \
             {} malformed urls, {} without manifests",
            summary.candidates,
            summary.extracted_repos,
            summary.rows_written,
            summary.skipped_malformed,
            summary.skipped_no_manifest,
        );
        Ok(summary)
    }

    /// One repository: parse its URL, try each manifest source in order,
    /// return the parsed dependency names of the first that works.
    fn crawl_one(&mut self, repo_url: &str) -> std::result::Result<Vec<String>, Skip> {
        let (owner, name) = parse_repo_url(repo_url).map_err(|e| {
            log::warn!("{e}, skipping");
            Skip::MalformedUrl
        })?;

        // One throttle slot per crawled repository
        self.limiter.acquire();

        for &(filename, parser) in MANIFEST_SOURCES {
            match self.fetcher.read_file(&owner, &name, filename) {
                Ok(content) => match parser(&content) {
                    Ok(deps) => {
                        log::debug!("{owner}/{name}: {} deps from {filename}", deps.len());
                        return Ok(deps);
                    }
                    Err(e) => {
                        log::debug!("{owner}/{name}/{filename}: {e}");
                        continue;
                    }
                },
                Err(FetchError::NotFound) => continue,
                Err(e) => {
                    // Retries already happened inside the fetcher; whatever
                    // is left counts as a missing manifest for this run
                    log::debug!("{owner}/{name}/{filename}: {e}");
                    continue;
                }
            }
        }

        log::warn!("{owner}/{name}: no recognized manifest, skipping");
        Err(Skip::NoManifest)
    }

    fn flush(
        &self,
        deps_id: &TableId,
        batch: &mut Vec<Row>,
        summary: &mut ExtractSummary,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        log::info!("inserting {} dependency rows", batch.len());
        self.warehouse
            .insert_rows(deps_id, batch)
            .context("dependency batch insert failed")?;
        summary.rows_written += batch.len();
        summary.flushes += 1;
        batch.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    use papercode_warehouse::DuckWarehouse;

    /// Canned per-path file contents, plus a call log.
    #[derive(Default)]
    struct FakeFetcher {
        files: HashMap<(String, String), String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn with_file(mut self, repo: &str, path: &str, content: &str) -> Self {
            self.files
                .insert((repo.to_string(), path.to_string()), content.to_string());
            self
        }
    }

    impl RepoFetcher for FakeFetcher {
        fn read_file(&self, owner: &str, repo: &str, path: &str) -> Result<String, FetchError> {
            self.calls.borrow_mut().push(format!("{owner}/{repo}/{path}"));
            self.files
                .get(&(format!("{owner}/{repo}"), path.to_string()))
                .cloned()
                .ok_or(FetchError::NotFound)
        }
    }

    fn tables() -> DepTables {
        DepTables {
            paper: TableId::new("papers_and_code", "paper"),
            paper_repo: TableId::new("papers_and_code", "paper_repo"),
            deps: TableId::new("papers_and_code", "paper_repo_deps"),
        }
    }

    fn limiter() -> RateLimiter {
        // Wide open: tests never sleep
        RateLimiter::new(10_000, Duration::from_secs(1))
    }

    fn seeded_warehouse(papers: &[(&str, &str)], links: &[(&str, &str)]) -> DuckWarehouse {
        let wh = DuckWarehouse::open_in_memory().unwrap();
        wh.ensure_dataset("papers_and_code").unwrap();
        let t = tables();
        wh.create_table(
            &t.paper,
            &[
                Field::required("paper_url", FieldType::String),
                Field::required("date", FieldType::Date),
            ],
        )
        .unwrap();
        wh.create_table(
            &t.paper_repo,
            &[
                Field::required("paper_url", FieldType::String),
                Field::required("repo_url", FieldType::String),
            ],
        )
        .unwrap();
        let paper_rows: Vec<Row> = papers
            .iter()
            .map(|(url, date)| {
                vec![
                    Value::from(*url),
                    Value::Date(date.parse().unwrap()),
                ]
            })
            .collect();
        wh.insert_rows(&t.paper, &paper_rows).unwrap();
        let link_rows: Vec<Row> = links
            .iter()
            .map(|(p, r)| vec![Value::from(*p), Value::from(*r)])
            .collect();
        wh.insert_rows(&t.paper_repo, &link_rows).unwrap();
        wh
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
    }

    fn deps_in(wh: &DuckWarehouse) -> Vec<(String, String)> {
        wh.fetch_rows(
            "SELECT repo_url, repo_dep FROM papers_and_code.paper_repo_deps \
             ORDER BY repo_url, repo_dep",
        )
        .unwrap()
        .into_iter()
        .map(|r| {
            (
                r[0].as_str().unwrap().to_string(),
                r[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
    }

    #[test]
    fn malformed_url_skips_without_aborting() {
        let wh = seeded_warehouse(
            &[("p1", "2023-05-01"), ("p2", "2023-05-02")],
            &[
                // LIKE-pattern matches but the path shape is broken
                ("p1", "https://github.com/only-owner"),
                ("p2", "https://github.com/pallets/flask"),
            ],
        );
        let fetcher =
            FakeFetcher::default().with_file("pallets/flask", "requirements.txt", "click\n");
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();

        assert_eq!(summary.skipped_malformed, 1);
        assert_eq!(
            deps_in(&wh),
            vec![("https://github.com/pallets/flask".to_string(), "click".to_string())]
        );
    }

    #[test]
    fn falls_back_to_pyproject() {
        let wh = seeded_warehouse(
            &[("p1", "2023-05-01")],
            &[("p1", "https://github.com/acme/widget")],
        );
        let fetcher = FakeFetcher::default().with_file(
            "acme/widget",
            "pyproject.toml",
            "[project]\ndependencies = [\"numpy>=1.24\"]\n",
        );
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();

        assert_eq!(summary.extracted_repos, 1);
        assert_eq!(
            fetcher.calls.borrow().as_slice(),
            [
                "acme/widget/requirements.txt",
                "acme/widget/pyproject.toml"
            ]
        );
        assert_eq!(
            deps_in(&wh),
            vec![("https://github.com/acme/widget".to_string(), "numpy".to_string())]
        );
    }

    #[test]
    fn missing_both_manifests_is_recorded_skip() {
        let wh = seeded_warehouse(
            &[("p1", "2023-05-01")],
            &[("p1", "https://github.com/acme/empty")],
        );
        let fetcher = FakeFetcher::default();
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();

        assert_eq!(summary.skipped_no_manifest, 1);
        assert_eq!(summary.rows_written, 0);
        assert!(deps_in(&wh).is_empty());
    }

    #[test]
    fn second_run_is_append_only() {
        let wh = seeded_warehouse(
            &[("p1", "2023-05-01")],
            &[("p1", "https://github.com/pallets/flask")],
        );
        let fetcher =
            FakeFetcher::default().with_file("pallets/flask", "requirements.txt", "click\njinja2\n");
        let (from, to) = window();

        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());
        ex.extract(from, to, &ProgressContext::new()).unwrap();
        assert_eq!(deps_in(&wh).len(), 2);

        // Anti-join excludes the already-extracted repository entirely
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();
        assert_eq!(summary.candidates, 0);
        assert_eq!(summary.rows_written, 0);
        assert_eq!(deps_in(&wh).len(), 2);
    }

    #[test]
    fn papers_outside_window_excluded() {
        let wh = seeded_warehouse(
            &[("p1", "2022-12-31")],
            &[("p1", "https://github.com/pallets/flask")],
        );
        let fetcher =
            FakeFetcher::default().with_file("pallets/flask", "requirements.txt", "click\n");
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();
        assert_eq!(summary.candidates, 0);
    }

    #[test]
    fn flush_count_matches_batch_cadence() {
        // 7 candidates, flush every 3: flushes after #3, #6 and at end-of-stream
        let papers: Vec<(String, String)> = (0..7)
            .map(|i| (format!("p{i}"), "2023-05-01".to_string()))
            .collect();
        let links: Vec<(String, String)> = (0..7)
            .map(|i| (format!("p{i}"), format!("https://github.com/acme/repo{i}")))
            .collect();
        let papers_ref: Vec<(&str, &str)> = papers
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let links_ref: Vec<(&str, &str)> = links
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let wh = seeded_warehouse(&papers_ref, &links_ref);

        let mut fetcher = FakeFetcher::default();
        for i in 0..7 {
            fetcher = fetcher.with_file(
                &format!("acme/repo{i}"),
                "requirements.txt",
                "flask\nrequests\n",
            );
        }
        let mut ex =
            DependencyExtractor::new(&wh, &fetcher, limiter(), tables()).with_flush_every(3);

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();

        assert_eq!(summary.candidates, 7);
        assert_eq!(summary.flushes, 3); // ceil(7/3)
        assert_eq!(summary.rows_written, 14);
        assert_eq!(deps_in(&wh).len(), 14);
    }

    #[test]
    fn default_cadence_flushes_every_hundred() {
        // 250 candidates at the default cadence: flushes at 100, 200 and a
        // short final flush of 50
        let papers: Vec<(String, String)> = (0..250)
            .map(|i| (format!("p{i}"), "2023-05-01".to_string()))
            .collect();
        let links: Vec<(String, String)> = (0..250)
            .map(|i| (format!("p{i}"), format!("https://github.com/acme/repo{i}")))
            .collect();
        let papers_ref: Vec<(&str, &str)> = papers
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let links_ref: Vec<(&str, &str)> = links
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let wh = seeded_warehouse(&papers_ref, &links_ref);

        let mut fetcher = FakeFetcher::default();
        for i in 0..250 {
            fetcher = fetcher.with_file(&format!("acme/repo{i}"), "requirements.txt", "flask\n");
        }
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();
        assert_eq!(summary.candidates, 250);
        assert_eq!(summary.flushes, 3); // ceil(250/100)
        assert_eq!(summary.rows_written, 250);
    }

    #[test]
    fn exact_multiple_skips_empty_final_flush() {
        let papers: Vec<(String, String)> = (0..4)
            .map(|i| (format!("p{i}"), "2023-05-01".to_string()))
            .collect();
        let links: Vec<(String, String)> = (0..4)
            .map(|i| (format!("p{i}"), format!("https://github.com/acme/repo{i}")))
            .collect();
        let papers_ref: Vec<(&str, &str)> = papers
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let links_ref: Vec<(&str, &str)> = links
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let wh = seeded_warehouse(&papers_ref, &links_ref);

        let mut fetcher = FakeFetcher::default();
        for i in 0..4 {
            fetcher = fetcher.with_file(&format!("acme/repo{i}"), "requirements.txt", "flask\n");
        }
        let mut ex =
            DependencyExtractor::new(&wh, &fetcher, limiter(), tables()).with_flush_every(2);

        let (from, to) = window();
        let summary = ex.extract(from, to, &ProgressContext::new()).unwrap();
        assert_eq!(summary.flushes, 2); // ceil(4/2), nothing left at end
        assert_eq!(summary.rows_written, 4);
    }

    #[test]
    fn creates_deps_table_when_absent() {
        let wh = seeded_warehouse(&[], &[]);
        let fetcher = FakeFetcher::default();
        let mut ex = DependencyExtractor::new(&wh, &fetcher, limiter(), tables());

        let (from, to) = window();
        ex.extract(from, to, &ProgressContext::new()).unwrap();
        assert_eq!(
            wh.lookup_table(&tables().deps).unwrap(),
            TableLookup::Found
        );
    }
}
