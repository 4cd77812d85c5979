use std::sync::Arc;

use core_types::{DocumentApi, SearchResult};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Blank,
    /// Another search is still running; nothing was sent.
    Busy,
    Completed,
    Failed(String),
}

#[derive(Debug, Default)]
struct RagState {
    query: String,
    model_id: Option<String>,
    result: Option<SearchResult>,
    in_flight: bool,
    last_error: Option<String>,
}

/// Cross-document question answering. Keeps only the latest result.
#[derive(Clone)]
pub struct RagSearch {
    api: Arc<dyn DocumentApi>,
    state: Arc<Mutex<RagState>>,
}

impl RagSearch {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(RagState::default())),
        }
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.state.lock().query = query.into();
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    pub fn set_model(&self, model_id: Option<String>) {
        self.state.lock().model_id = model_id;
    }

    pub fn model(&self) -> Option<String> {
        self.state.lock().model_id.clone()
    }

    pub fn result(&self) -> Option<SearchResult> {
        self.state.lock().result.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub async fn search(&self) -> SearchOutcome {
        let (query, model_id) = {
            let mut state = self.state.lock();
            if state.query.trim().is_empty() {
                return SearchOutcome::Blank;
            }
            if state.in_flight {
                debug!("rag search already running");
                return SearchOutcome::Busy;
            }
            state.in_flight = true;
            (state.query.trim().to_owned(), state.model_id.clone())
        };

        let result = self.api.rag_search(&query, model_id.as_deref()).await;

        let mut state = self.state.lock();
        state.in_flight = false;
        match result {
            Ok(result) => {
                info!(
                    query = %query,
                    sources = result.sources.len(),
                    confidence = result.confidence.value(),
                    "rag search completed"
                );
                state.result = Some(result);
                state.last_error = None;
                SearchOutcome::Completed
            }
            Err(err) => {
                warn!(query = %query, error = %err, "rag search failed");
                state.last_error = Some(err.to_string());
                SearchOutcome::Failed(err.to_string())
            }
        }
    }
}
