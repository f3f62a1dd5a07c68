use crate::ast::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One course's entry in `prereq_structured.json`, as written by the crawl driver.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseRecord {
    pub prereq: Option<Node>,
    pub coreq: Option<Node>,
    #[allow(dead_code)]
    pub raw: String,
    pub incompat: Option<Node>,
    pub units: String,
    pub summary: String,
}

/// The shape served over the external HTTP view, mirroring the catalog tool's own
/// `name`/`description`/`incompatible`/`units`/`prerequisites` field mapping.
#[derive(Debug, Clone, Serialize)]
pub struct CourseResponse {
    pub name: String,
    pub description: String,
    pub incompatible: Vec<String>,
    pub units: i64,
    pub prerequisites: Option<Node>,
}

impl CourseResponse {
    pub fn from_record(code: &str, record: &CourseRecord) -> Self {
        let incompatible = record
            .incompat
            .as_ref()
            .map(|n| n.referenced_codes())
            .unwrap_or_default();
        let units = if !record.units.is_empty() && record.units.bytes().all(|b| b.is_ascii_digit()) {
            record.units.parse().unwrap_or(0)
        } else {
            0
        };
        CourseResponse {
            name: code.to_string(),
            description: record.summary.clone(),
            incompatible,
            units,
            prerequisites: record.prereq.clone(),
        }
    }
}

/// In-memory snapshot of `prereq_structured.json`, loaded once at server startup.
pub struct CourseStore {
    pub records: HashMap<String, CourseRecord>,
}

impl CourseStore {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read {:?}: {e}", path))?;
        let records: HashMap<String, CourseRecord> = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("malformed structured data at {:?}: {e}", path))?;
        Ok(Self { records })
    }
}
