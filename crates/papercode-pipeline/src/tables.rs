//! Table identifiers and schemas for the warehouse datasets.

use papercode_warehouse::{Field, FieldType, TableId};

/// Dataset (schema) names the pipeline writes into. The catalog dataset
/// holds the reporting tables; the archive dataset holds the intermediate
/// activity staging table that is dropped at the end of each run.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub catalog: String,
    pub archive: String,
}

impl Datasets {
    pub fn paper(&self) -> TableId {
        TableId::new(&self.catalog, "paper")
    }

    pub fn paper_repo(&self) -> TableId {
        TableId::new(&self.catalog, "paper_repo")
    }

    pub fn paper_repo_deps(&self) -> TableId {
        TableId::new(&self.catalog, "paper_repo_deps")
    }

    pub fn repo_names(&self) -> TableId {
        TableId::new(&self.catalog, "repo_names")
    }

    /// Intermediate push-event staging table (dropped at step 8).
    pub fn repo_activity_staging(&self) -> TableId {
        TableId::new(&self.archive, "repo_activity")
    }

    /// Cross-region copy of the staging table (dropped at step 8).
    pub fn repo_activity_copy(&self) -> TableId {
        TableId::new(&self.catalog, "repo_activity")
    }

    pub fn paper_repo_activity(&self) -> TableId {
        TableId::new(&self.catalog, "paper_repo_activity")
    }
}

pub fn paper_schema() -> Vec<Field> {
    vec![
        Field::required("paper_url", FieldType::String),
        Field::nullable("arxiv_id", FieldType::String),
        Field::nullable("title", FieldType::String),
        Field::nullable("abstract", FieldType::String),
        Field::nullable("url_abs", FieldType::String),
        Field::nullable("url_pdf", FieldType::String),
        Field::nullable("proceeding", FieldType::String),
        Field::nullable("date", FieldType::Date),
    ]
}

pub fn paper_repo_schema() -> Vec<Field> {
    vec![
        Field::required("paper_url", FieldType::String),
        Field::required("repo_url", FieldType::String),
        Field::nullable("mentioned_in_paper", FieldType::Bool),
        Field::nullable("mentioned_in_github", FieldType::Bool),
    ]
}

pub fn repo_activity_schema() -> Vec<Field> {
    vec![
        Field::required("name", FieldType::String),
        Field::required("created_at", FieldType::Timestamp),
    ]
}

pub fn repo_names_schema() -> Vec<Field> {
    vec![Field::required("name", FieldType::String)]
}
