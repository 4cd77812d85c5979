pub mod analysis;
pub mod api;
pub mod chat;
pub mod document;
pub mod format;
pub mod search;

use serde::{Deserialize, Serialize};

pub use analysis::{
    Classification, DocumentAnalysis, Entity, EntityMap, ExtractedTable, Summary,
};
pub use api::{ApiError, ApiResult, DocumentApi};
pub use chat::{
    ANSWER_FAILED_TEXT, AnswerOutcome, AskResponse, ChatMessage, Confidence, MessageId,
};
pub use document::{
    ContentLocator, Document, DocumentId, IndexingStatus, UploadFile, content_type_for,
    parse_timestamp,
};
pub use format::format_file_size;
pub use search::{ModelInfo, SearchResult, SearchSource};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UiLanguage {
    ZhCn,
    EnUs,
}

/// What the model selector picks when the backend flags no model as default.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelFallback {
    /// Leave the selection empty until the user picks one.
    #[default]
    None,
    FirstListed,
}
