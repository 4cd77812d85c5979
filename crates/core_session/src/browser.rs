use std::sync::Arc;

use core_types::{Document, DocumentApi};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::LoadOutcome;

#[derive(Debug, Default)]
struct BrowserState {
    query: String,
    documents: Vec<Document>,
    request_generation: u64,
    loading: bool,
    last_error: Option<String>,
}

/// Document list shown in the sidebar. Only the most recently issued list or search
/// request may replace the list; a failure keeps what is already shown.
#[derive(Clone)]
pub struct DocumentBrowser {
    api: Arc<dyn DocumentApi>,
    state: Arc<Mutex<BrowserState>>,
}

impl DocumentBrowser {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(BrowserState::default())),
        }
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state.lock().documents.clone()
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Re-runs the current query, or lists everything when it is blank.
    pub async fn refresh(&self) -> LoadOutcome {
        let query = self.query();
        self.search(&query).await
    }

    pub async fn search(&self, query: &str) -> LoadOutcome {
        let generation = {
            let mut state = self.state.lock();
            state.query = query.to_owned();
            state.request_generation += 1;
            state.loading = true;
            state.request_generation
        };

        let result = if query.trim().is_empty() {
            self.api.list_documents().await
        } else {
            self.api.search_documents(query).await
        };

        let mut state = self.state.lock();
        if state.request_generation != generation {
            debug!(query, generation, "discarding superseded document listing");
            return LoadOutcome::Discarded;
        }
        state.loading = false;
        match result {
            Ok(documents) => {
                debug!(query, count = documents.len(), "document list updated");
                state.documents = documents;
                state.last_error = None;
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(query, error = %err, "document listing failed");
                state.last_error = Some(err.to_string());
                LoadOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedApi, document};

    fn names(browser: &DocumentBrowser) -> Vec<String> {
        browser
            .documents()
            .into_iter()
            .map(|doc| doc.file_name)
            .collect()
    }

    fn library() -> ScriptedApi {
        ScriptedApi::default().with_documents(vec![
            document("d1", "contract.pdf"),
            document("d2", "invoice.docx"),
            document("d3", "contract-annex.txt"),
        ])
    }

    #[tokio::test]
    async fn blank_query_lists_everything() {
        let api = Arc::new(library());
        let browser = DocumentBrowser::new(api.clone());
        assert!(browser.search("  ").await.is_applied());
        assert_eq!(names(&browser).len(), 3);
        assert_eq!(api.calls(), ["list"]);
    }

    #[tokio::test]
    async fn search_filters_and_refresh_reuses_query() {
        let api = Arc::new(library());
        let browser = DocumentBrowser::new(api.clone());
        browser.search("contract").await;
        assert_eq!(names(&browser), ["contract.pdf", "contract-annex.txt"]);

        browser.refresh().await;
        assert_eq!(api.call_count("search:contract"), 2);
        assert_eq!(browser.query(), "contract");
    }

    #[tokio::test]
    async fn failure_keeps_previous_list() {
        let api = Arc::new(library());
        api.fail("search:invoice");
        let browser = DocumentBrowser::new(api.clone());
        browser.refresh().await;

        let outcome = browser.search("invoice").await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert_eq!(names(&browser).len(), 3);
        assert!(browser.last_error().is_some());
        assert!(!browser.is_loading());

        api.recover("search:invoice");
        browser.refresh().await;
        assert_eq!(names(&browser), ["invoice.docx"]);
        assert_eq!(browser.last_error(), None);
    }

    #[tokio::test]
    async fn older_request_cannot_overwrite_newer_one() {
        let api = Arc::new(library());
        api.hold("search:con");
        let browser = DocumentBrowser::new(api.clone());

        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.search("con").await }
        });
        api.wait_for_call("search:con").await;
        browser.search("invoice").await;
        api.release("search:con");

        assert_eq!(slow.await.expect("join"), LoadOutcome::Discarded);
        assert_eq!(names(&browser), ["invoice.docx"]);
    }
}
