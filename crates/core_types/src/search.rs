use serde::{Deserialize, Serialize};

use crate::chat::Confidence;
use crate::document::DocumentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    pub id: DocumentId,
    pub file_name: String,
    pub similarity: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub answer: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub sources: Vec<SearchSource>,
}
