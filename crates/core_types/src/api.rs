use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::{Classification, DocumentAnalysis, EntityMap, ExtractedTable, Summary};
use crate::chat::{AskResponse, ChatMessage};
use crate::document::{ContentLocator, Document, DocumentId, UploadFile};
use crate::search::{ModelInfo, SearchResult};

/// Failure of a single backend call. Every variant means "the request failed"; the
/// split only exists so logs and callers can tell transport trouble from bad replies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response payload: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::RequestFailed(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The backend's document surface. Calls are at-most-once: implementations never retry.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Returns as soon as the backend has accepted the file; indexing continues server-side.
    async fn upload(&self, file: UploadFile) -> ApiResult<Document>;
    async fn list_documents(&self) -> ApiResult<Vec<Document>>;
    /// A blank query behaves exactly like [`DocumentApi::list_documents`].
    async fn search_documents(&self, query: &str) -> ApiResult<Vec<Document>>;
    async fn content_locator(&self, document_id: &DocumentId) -> ApiResult<ContentLocator>;
    async fn list_models(&self) -> ApiResult<Vec<ModelInfo>>;
    async fn ask_question(
        &self,
        document_id: &DocumentId,
        question: &str,
        model_id: &str,
    ) -> ApiResult<AskResponse>;
    async fn rag_search(&self, query: &str, model_id: Option<&str>) -> ApiResult<SearchResult>;
    /// Ascending by timestamp.
    async fn chat_history(&self, document_id: &DocumentId) -> ApiResult<Vec<ChatMessage>>;
    async fn analysis(&self, document_id: &DocumentId) -> ApiResult<DocumentAnalysis>;
    async fn entities(&self, document_id: &DocumentId) -> ApiResult<EntityMap>;
    async fn summary(&self, document_id: &DocumentId) -> ApiResult<Summary>;
    async fn tables(&self, document_id: &DocumentId) -> ApiResult<Vec<ExtractedTable>>;
    async fn classification(&self, document_id: &DocumentId) -> ApiResult<Classification>;
}
