use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use core_types::{
    ApiError, ApiResult, AskResponse, ChatMessage, Classification, Confidence, ContentLocator,
    Document, DocumentAnalysis, DocumentApi, DocumentId, EntityMap, ExtractedTable,
    IndexingStatus, ModelInfo, SearchResult, Summary, UploadFile,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub(crate) fn document(id: &str, file_name: &str) -> Document {
    Document {
        id: DocumentId::from(id),
        file_name: file_name.to_owned(),
        file_size: 1024,
        uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        indexing_status: IndexingStatus::Pending,
        indexing_error: None,
    }
}

pub(crate) fn model(id: &str, is_default: bool) -> ModelInfo {
    ModelInfo {
        id: id.to_owned(),
        name: id.to_uppercase(),
        description: String::new(),
        is_default,
    }
}

/// Analysis whose category is the document id, so tests can tell snapshots apart.
pub(crate) fn analysis_for(id: &str) -> DocumentAnalysis {
    DocumentAnalysis {
        classification: Classification {
            category: id.to_owned(),
            confidence: Confidence::new(0.8),
            all_categories: IndexMap::new(),
        },
        entities: EntityMap::new(),
        summary: Summary {
            summary: format!("summary of {id}"),
            original_length: 100,
            summary_length: 14,
            compression_ratio: 0.14,
        },
        tables: Vec::new(),
    }
}

/// In-memory backend. Any call can be made to fail with [`ScriptedApi::fail`] or parked
/// until [`ScriptedApi::release`] with [`ScriptedApi::hold`]. Call keys look like
/// `content:<id>`, `history:<id>`, `analysis:<id>`, `ask:<question>`, `rag:<query>`,
/// `list`, `search:<query>`, `models` and `upload:<file name>`.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    documents: Mutex<Vec<Document>>,
    histories: Mutex<HashMap<DocumentId, Vec<ChatMessage>>>,
    models: Mutex<Vec<ModelInfo>>,
    answers: Mutex<HashMap<String, AskResponse>>,
    rag_results: Mutex<HashMap<String, SearchResult>>,
    failures: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
    uploads: AtomicU64,
}

impl ScriptedApi {
    pub(crate) fn with_documents(self, documents: Vec<Document>) -> Self {
        *self.documents.lock() = documents;
        self
    }

    pub(crate) fn with_models(self, models: Vec<ModelInfo>) -> Self {
        *self.models.lock() = models;
        self
    }

    pub(crate) fn set_documents(&self, documents: Vec<Document>) {
        *self.documents.lock() = documents;
    }

    pub(crate) fn set_models(&self, models: Vec<ModelInfo>) {
        *self.models.lock() = models;
    }

    pub(crate) fn set_history(&self, id: &str, messages: Vec<ChatMessage>) {
        self.histories.lock().insert(DocumentId::from(id), messages);
    }

    pub(crate) fn set_answer(&self, question: &str, response: AskResponse) {
        self.answers.lock().insert(question.to_owned(), response);
    }

    pub(crate) fn set_rag_result(&self, query: &str, result: SearchResult) {
        self.rag_results.lock().insert(query.to_owned(), result);
    }

    pub(crate) fn fail(&self, key: &str) {
        self.failures.lock().insert(key.to_owned());
    }

    pub(crate) fn recover(&self, key: &str) {
        self.failures.lock().remove(key);
    }

    pub(crate) fn hold(&self, key: &str) {
        self.gates
            .lock()
            .insert(key.to_owned(), Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().get(key) {
            gate.add_permits(1);
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == key).count()
    }

    /// Yields until a call with `key` has been issued.
    pub(crate) async fn wait_for_call(&self, key: &str) {
        for _ in 0..10_000 {
            if self.call_count(key) > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("call `{key}` never happened; saw {:?}", self.calls());
    }

    async fn enter(&self, key: String) -> ApiResult<()> {
        self.calls.lock().push(key.clone());
        let gate = self.gates.lock().get(&key).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.failures.lock().contains(&key) {
            return Err(ApiError::RequestFailed(format!("{key} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentApi for ScriptedApi {
    async fn upload(&self, file: UploadFile) -> ApiResult<Document> {
        self.enter(format!("upload:{}", file.file_name)).await?;
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let mut doc = document(&format!("d{n}"), &file.file_name);
        doc.file_size = file.size();
        self.documents.lock().push(doc.clone());
        Ok(doc)
    }

    async fn list_documents(&self) -> ApiResult<Vec<Document>> {
        self.enter("list".to_owned()).await?;
        Ok(self.documents.lock().clone())
    }

    async fn search_documents(&self, query: &str) -> ApiResult<Vec<Document>> {
        if query.trim().is_empty() {
            return self.list_documents().await;
        }
        self.enter(format!("search:{query}")).await?;
        let needle = query.to_lowercase();
        Ok(self
            .documents
            .lock()
            .iter()
            .filter(|doc| doc.file_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn content_locator(&self, document_id: &DocumentId) -> ApiResult<ContentLocator> {
        self.enter(format!("content:{document_id}")).await?;
        Ok(ContentLocator {
            url: format!("mem://{document_id}/content"),
            content_type: "application/pdf".to_owned(),
        })
    }

    async fn list_models(&self) -> ApiResult<Vec<ModelInfo>> {
        self.enter("models".to_owned()).await?;
        Ok(self.models.lock().clone())
    }

    async fn ask_question(
        &self,
        _document_id: &DocumentId,
        question: &str,
        model_id: &str,
    ) -> ApiResult<AskResponse> {
        self.enter(format!("ask:{question}")).await?;
        Ok(self
            .answers
            .lock()
            .get(question)
            .cloned()
            .unwrap_or_else(|| AskResponse {
                answer: format!("answer to {question}"),
                confidence: 0.5,
                success: true,
                model_name: model_id.to_owned(),
            }))
    }

    async fn rag_search(&self, query: &str, model_id: Option<&str>) -> ApiResult<SearchResult> {
        self.enter(format!("rag:{query}")).await?;
        if let Some(result) = self.rag_results.lock().get(query).cloned() {
            return Ok(result);
        }
        Ok(SearchResult {
            answer: format!("{query} via {}", model_id.unwrap_or("default")),
            confidence: Confidence::new(0.62),
            sources: Vec::new(),
        })
    }

    async fn chat_history(&self, document_id: &DocumentId) -> ApiResult<Vec<ChatMessage>> {
        self.enter(format!("history:{document_id}")).await?;
        Ok(self
            .histories
            .lock()
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn analysis(&self, document_id: &DocumentId) -> ApiResult<DocumentAnalysis> {
        self.enter(format!("analysis:{document_id}")).await?;
        Ok(analysis_for(document_id.as_str()))
    }

    async fn entities(&self, document_id: &DocumentId) -> ApiResult<EntityMap> {
        Ok(self.analysis(document_id).await?.entities)
    }

    async fn summary(&self, document_id: &DocumentId) -> ApiResult<Summary> {
        Ok(self.analysis(document_id).await?.summary)
    }

    async fn tables(&self, document_id: &DocumentId) -> ApiResult<Vec<ExtractedTable>> {
        Ok(self.analysis(document_id).await?.tables)
    }

    async fn classification(&self, document_id: &DocumentId) -> ApiResult<Classification> {
        Ok(self.analysis(document_id).await?.classification)
    }
}
