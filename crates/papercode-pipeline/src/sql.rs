//! SQL generation for the materialized tables.
//!
//! Sources:
//! - Staged catalog dumps are JSON arrays read through the engine's JSON
//!   reader (gzip handled by extension).
//! - The activity archive is an externally maintained table with columns
//!   ("type" VARCHAR, repo_name VARCHAR, created_at TIMESTAMP); only
//!   push events are ingested.

use std::path::Path;

use chrono::NaiveDate;
use papercode_warehouse::TableId;

/// Full catalog read for the paper table.
pub fn paper_load(staged_dump: &Path) -> String {
    format!(
        "SELECT paper_url, arxiv_id, title, \"abstract\", url_abs, url_pdf, \
         proceeding, CAST(\"date\" AS DATE) AS \"date\" \
         FROM read_json('{}', format = 'array')",
        staged_dump.display()
    )
}

/// Full catalog read for the paper/repository link table.
pub fn paper_repo_load(staged_dump: &Path) -> String {
    format!(
        "SELECT paper_url, repo_url, mentioned_in_paper, mentioned_in_github \
         FROM read_json('{}', format = 'array')",
        staged_dump.display()
    )
}

/// Activity full load: push events from the start of the year.
pub fn activity_populate(archive_source: &str, year_start: NaiveDate) -> String {
    format!(
        "SELECT repo_name AS name, created_at FROM {archive_source} \
         WHERE \"type\" = 'PushEvent' \
         AND created_at >= TIMESTAMP '{year_start} 00:00:00'"
    )
}

/// Activity delta load: yesterday's push events, anti-joined against rows
/// already present so the append is idempotent on re-run.
pub fn activity_delta(archive_source: &str, day: NaiveDate, destination: &TableId) -> String {
    format!(
        "SELECT repo_name AS name, created_at FROM {archive_source} s \
         WHERE \"type\" = 'PushEvent' \
         AND CAST(s.created_at AS DATE) = DATE '{day}' \
         AND NOT EXISTS (SELECT 1 FROM {destination} d \
         WHERE d.name = s.repo_name AND d.created_at = s.created_at)"
    )
}

/// Reshape GitHub-linked repositories into "owner/repo" names.
pub fn repo_names(paper: &TableId, paper_repo: &TableId, since: NaiveDate) -> String {
    format!(
        "SELECT DISTINCT printf('%s/%s', \
         split_part(split_part(repo_url, 'https://github.com/', 2), '/', 1), \
         split_part(split_part(repo_url, 'https://github.com/', 2), '/', 2)) AS name \
         FROM {paper_repo} pr JOIN {paper} p ON p.paper_url = pr.paper_url \
         WHERE p.\"date\" >= DATE '{since}' \
         AND pr.repo_url LIKE 'https://github.com/%'"
    )
}

/// Cross-region copy of the activity staging table.
pub fn region_copy(source: &TableId) -> String {
    format!("SELECT name, created_at FROM {source}")
}

/// Final join: copied activity restricted to paper repositories.
pub fn paper_repo_activity(activity_copy: &TableId, repo_names: &TableId) -> String {
    format!(
        "SELECT ra.name, ra.created_at \
         FROM {activity_copy} ra JOIN {repo_names} rn USING (name)"
    )
}
