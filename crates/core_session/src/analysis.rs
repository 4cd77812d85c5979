use std::sync::Arc;

use core_types::{DocumentAnalysis, DocumentApi, DocumentId};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::LoadOutcome;
use crate::selection::{DocumentSelection, SelectionTicket};

pub const ANALYSIS_FAILED_TEXT: &str = "Analysis could not be loaded for this document.";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum AnalysisState {
    #[default]
    Idle,
    Loading {
        document_id: DocumentId,
    },
    Ready {
        document_id: DocumentId,
        analysis: Arc<DocumentAnalysis>,
    },
    Failed {
        document_id: DocumentId,
        message: String,
    },
}

impl AnalysisState {
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            AnalysisState::Idle => None,
            AnalysisState::Loading { document_id }
            | AnalysisState::Ready { document_id, .. }
            | AnalysisState::Failed { document_id, .. } => Some(document_id),
        }
    }

    pub fn analysis(&self) -> Option<&DocumentAnalysis> {
        match self {
            AnalysisState::Ready { analysis, .. } => Some(analysis),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    ticket: Option<SelectionTicket>,
    state: AnalysisState,
}

#[derive(Clone)]
pub struct AnalysisLoader {
    api: Arc<dyn DocumentApi>,
    selection: DocumentSelection,
    state: Arc<Mutex<LoaderState>>,
}

impl AnalysisLoader {
    pub fn new(api: Arc<dyn DocumentApi>, selection: DocumentSelection) -> Self {
        Self {
            api,
            selection,
            state: Arc::new(Mutex::new(LoaderState::default())),
        }
    }

    pub fn state(&self) -> AnalysisState {
        self.state.lock().state.clone()
    }

    pub fn begin(&self, ticket: &SelectionTicket) {
        let mut state = self.state.lock();
        state.ticket = Some(ticket.clone());
        state.state = AnalysisState::Loading {
            document_id: ticket.document_id().clone(),
        };
    }

    pub async fn load(&self, ticket: &SelectionTicket) -> LoadOutcome {
        let result = self.api.analysis(ticket.document_id()).await;

        let current = self.selection.is_current(ticket);
        let mut state = self.state.lock();
        if !current || state.ticket.as_ref() != Some(ticket) {
            debug!(document_id = %ticket.document_id(), "discarding stale analysis");
            return LoadOutcome::Discarded;
        }
        let document_id = ticket.document_id().clone();
        match result {
            Ok(analysis) => {
                debug!(
                    document_id = %document_id,
                    category = %analysis.classification.category,
                    tables = analysis.tables.len(),
                    "analysis ready"
                );
                state.state = AnalysisState::Ready {
                    document_id,
                    analysis: Arc::new(analysis),
                };
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(document_id = %document_id, error = %err, "analysis failed");
                state.state = AnalysisState::Failed {
                    document_id,
                    message: ANALYSIS_FAILED_TEXT.to_owned(),
                };
                LoadOutcome::Failed(err.to_string())
            }
        }
    }
}
