use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::chat::Confidence;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub confidence: Confidence,
    /// Category → score, in the backend's ranking order.
    #[serde(default)]
    pub all_categories: IndexMap<String, Confidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub confidence: Confidence,
}

/// Entity-type label (`PERSON`, `ORG`, ...) → occurrences in document order.
pub type EntityMap = IndexMap<String, Vec<Entity>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    #[serde(default)]
    pub original_length: usize,
    #[serde(default)]
    pub summary_length: usize,
    #[serde(default)]
    pub compression_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    #[serde(rename = "table_id")]
    pub id: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(rename = "rows", default)]
    pub row_count: usize,
    #[serde(default)]
    pub columns_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(rename = "data", default)]
    pub rows: Vec<IndexMap<String, String>>,
}

impl ExtractedTable {
    /// Cell values for one row, ordered by `columns`. Missing cells are empty.
    pub fn row_values(&self, index: usize) -> Option<Vec<&str>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .map(|column| row.get(column).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub classification: Classification,
    #[serde(default)]
    pub entities: EntityMap,
    pub summary: Summary,
    #[serde(default)]
    pub tables: Vec<ExtractedTable>,
}

impl DocumentAnalysis {
    pub fn entity_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }
}
