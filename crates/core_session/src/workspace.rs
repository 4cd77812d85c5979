use std::sync::Arc;
use std::time::Duration;

use core_types::{
    ApiResult, ContentLocator, Document, DocumentApi, ModelFallback, ModelInfo, SearchResult,
    UploadFile,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::LoadOutcome;
use crate::analysis::{AnalysisLoader, AnalysisState};
use crate::browser::DocumentBrowser;
use crate::chat::{ChatSession, HistoryStatus, SubmitOutcome, Transcript};
use crate::debounce::Debouncer;
use crate::models::{ModelSelector, ModelsStatus};
use crate::rag::{RagSearch, SearchOutcome};
use crate::selection::{ContentStatus, DocumentSelection};

#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    pub search_debounce: Duration,
    pub model_fallback: ModelFallback,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
            model_fallback: ModelFallback::None,
        }
    }
}

/// Result of the three loads a selection fans out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub content: LoadOutcome,
    pub history: LoadOutcome,
    pub analysis: LoadOutcome,
}

/// Point-in-time copy of everything a front-end renders.
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    pub query: String,
    pub documents: Vec<Document>,
    pub list_loading: bool,
    pub list_error: Option<String>,
    pub selected: Option<Document>,
    pub content_locator: Option<ContentLocator>,
    pub content_status: ContentStatus,
    pub transcript: Transcript,
    pub history_status: HistoryStatus,
    pub pending_questions: usize,
    pub draft: String,
    pub models: Vec<ModelInfo>,
    pub selected_model: Option<String>,
    pub models_status: ModelsStatus,
    pub analysis: AnalysisState,
    pub rag_query: String,
    pub rag_result: Option<SearchResult>,
    pub rag_in_flight: bool,
    pub rag_error: Option<String>,
}

/// One document view: the list, the selection and everything keyed off it.
///
/// Must be created inside a Tokio runtime; the search debouncer and the listener that
/// turns committed queries into list requests run as background tasks until
/// [`Workspace::shutdown`] or drop.
pub struct Workspace {
    api: Arc<dyn DocumentApi>,
    browser: DocumentBrowser,
    selection: DocumentSelection,
    chat: ChatSession,
    models: ModelSelector,
    analysis: AnalysisLoader,
    rag: RagSearch,
    search_input: Debouncer<String>,
    listener: JoinHandle<()>,
}

impl Workspace {
    pub fn new(api: Arc<dyn DocumentApi>, options: WorkspaceOptions) -> Self {
        let browser = DocumentBrowser::new(api.clone());
        let selection = DocumentSelection::new(api.clone());
        let chat = ChatSession::new(api.clone(), selection.clone());
        let models = ModelSelector::new(api.clone(), options.model_fallback);
        let analysis = AnalysisLoader::new(api.clone(), selection.clone());
        let rag = RagSearch::new(api.clone());

        let (search_input, mut committed) = Debouncer::<String>::spawn(options.search_debounce);
        let listener = tokio::spawn({
            let browser = browser.clone();
            async move {
                while let Some(query) = committed.recv().await {
                    let browser = browser.clone();
                    tokio::spawn(async move {
                        browser.search(query.as_str()).await;
                    });
                }
            }
        });

        Self {
            api,
            browser,
            selection,
            chat,
            models,
            analysis,
            rag,
            search_input,
            listener,
        }
    }

    pub fn browser(&self) -> &DocumentBrowser {
        &self.browser
    }

    pub fn selection(&self) -> &DocumentSelection {
        &self.selection
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn models(&self) -> &ModelSelector {
        &self.models
    }

    pub fn analysis(&self) -> &AnalysisLoader {
        &self.analysis
    }

    pub fn rag(&self) -> &RagSearch {
        &self.rag
    }

    /// Loads the model list and the unfiltered document list.
    pub async fn start(&self) -> (LoadOutcome, LoadOutcome) {
        futures::join!(self.models.load(), self.browser.refresh())
    }

    /// Raw keystroke-level input. Only the value left standing after a quiet period
    /// reaches the backend.
    pub fn search_input(&self, text: impl Into<String>) -> bool {
        self.search_input.push(text.into())
    }

    pub async fn refresh_documents(&self) -> LoadOutcome {
        let outcome = self.browser.refresh().await;
        if outcome.is_applied() {
            self.selection.refresh_snapshot(&self.browser.documents());
        }
        outcome
    }

    pub async fn select_document(&self, document: Document) -> SelectionOutcome {
        let ticket = self.selection.begin(document);
        self.chat.reset_for(&ticket);
        self.analysis.begin(&ticket);

        let (content, history, analysis) = futures::join!(
            self.selection.load_content(&ticket),
            self.chat.load_history(&ticket),
            self.analysis.load(&ticket),
        );
        SelectionOutcome {
            content,
            history,
            analysis,
        }
    }

    /// Selects a document from the current list by id.
    pub async fn select_by_id(&self, id: &str) -> Option<SelectionOutcome> {
        let document = self
            .browser
            .documents()
            .into_iter()
            .find(|doc| doc.id.as_str() == id)?;
        Some(self.select_document(document).await)
    }

    /// Uploads the file and selects the new document regardless of what was selected
    /// before. On failure the selection is left alone and the error is returned for
    /// display.
    pub async fn handle_external_file_drop(&self, file: UploadFile) -> ApiResult<Document> {
        let file_name = file.file_name.clone();
        let size = file.size();
        let document = match self.api.upload(file).await {
            Ok(document) => document,
            Err(err) => {
                warn!(file_name = %file_name, size, error = %err, "upload failed");
                return Err(err);
            }
        };
        info!(document_id = %document.id, file_name = %document.file_name, "document uploaded");

        futures::join!(
            self.select_document(document.clone()),
            self.refresh_documents()
        );
        Ok(document)
    }

    pub fn select_model(&self, model_id: &str) -> bool {
        self.models.select(model_id)
    }

    /// Submits the chat draft with the selected model.
    pub async fn submit_question(&self) -> SubmitOutcome {
        let draft = self.chat.draft();
        let model = self.models.selected();
        self.chat.submit_question(&draft, model.as_deref()).await
    }

    pub async fn ask(&self, question: &str) -> SubmitOutcome {
        self.chat.set_draft(question);
        self.submit_question().await
    }

    pub async fn rag_search(&self, query: &str) -> SearchOutcome {
        self.rag.set_query(query);
        self.rag.set_model(self.models.selected());
        self.rag.search().await
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            query: self.browser.query(),
            documents: self.browser.documents(),
            list_loading: self.browser.is_loading(),
            list_error: self.browser.last_error(),
            selected: self.selection.selected(),
            content_locator: self.selection.content_locator(),
            content_status: self.selection.content_status(),
            transcript: self.chat.transcript(),
            history_status: self.chat.history_status(),
            pending_questions: self.chat.pending_questions(),
            draft: self.chat.draft(),
            models: self.models.models(),
            selected_model: self.models.selected(),
            models_status: self.models.status(),
            analysis: self.analysis.state(),
            rag_query: self.rag.query(),
            rag_result: self.rag.result(),
            rag_in_flight: self.rag.is_in_flight(),
            rag_error: self.rag.last_error(),
        }
    }

    /// Cancels any pending search emission and stops the query listener.
    pub fn shutdown(&self) {
        self.search_input.cancel();
        self.listener.abort();
        info!("workspace shut down");
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
