use std::sync::Arc;

use core_types::{ContentLocator, Document, DocumentApi, DocumentId};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::LoadOutcome;

/// Identifies one selection event. Re-selecting the same document yields a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    document_id: DocumentId,
}

impl SelectionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The fetch failed; the viewer shows an empty but loadable state.
    Unavailable,
}

#[derive(Debug, Default)]
struct SelectionState {
    generation: u64,
    selected: Option<Document>,
    content_locator: Option<ContentLocator>,
    content_status: ContentStatus,
}

impl SelectionState {
    fn ticket(&self) -> Option<SelectionTicket> {
        self.selected.as_ref().map(|doc| SelectionTicket {
            generation: self.generation,
            document_id: doc.id.clone(),
        })
    }

    fn is_current(&self, ticket: &SelectionTicket) -> bool {
        self.generation == ticket.generation
            && self
                .selected
                .as_ref()
                .is_some_and(|doc| doc.id == ticket.document_id)
    }
}

/// Owns the selected document and the viewer's content locator.
///
/// Chat, analysis and the content loader all key off the ticket handed out by
/// [`DocumentSelection::begin`] and re-check it with [`DocumentSelection::is_current`]
/// before applying anything.
#[derive(Clone)]
pub struct DocumentSelection {
    api: Arc<dyn DocumentApi>,
    state: Arc<Mutex<SelectionState>>,
}

impl DocumentSelection {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(SelectionState::default())),
        }
    }

    pub fn selected(&self) -> Option<Document> {
        self.state.lock().selected.clone()
    }

    pub fn content_locator(&self) -> Option<ContentLocator> {
        self.state.lock().content_locator.clone()
    }

    pub fn content_status(&self) -> ContentStatus {
        self.state.lock().content_status
    }

    pub fn current_ticket(&self) -> Option<SelectionTicket> {
        self.state.lock().ticket()
    }

    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        self.state.lock().is_current(ticket)
    }

    /// Switches the selection and drops the previous locator straight away so stale
    /// content is never shown while the new one loads.
    pub fn begin(&self, document: Document) -> SelectionTicket {
        let mut state = self.state.lock();
        state.generation += 1;
        info!(document_id = %document.id, generation = state.generation, "document selected");
        let ticket = SelectionTicket {
            generation: state.generation,
            document_id: document.id.clone(),
        };
        state.selected = Some(document);
        state.content_locator = None;
        state.content_status = ContentStatus::Loading;
        ticket
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.selected = None;
        state.content_locator = None;
        state.content_status = ContentStatus::Idle;
    }

    pub async fn select_document(&self, document: Document) -> LoadOutcome {
        let ticket = self.begin(document);
        self.load_content(&ticket).await
    }

    pub async fn load_content(&self, ticket: &SelectionTicket) -> LoadOutcome {
        let result = self.api.content_locator(&ticket.document_id).await;

        let mut state = self.state.lock();
        if !state.is_current(ticket) {
            debug!(
                document_id = %ticket.document_id,
                generation = ticket.generation,
                "discarding stale content locator"
            );
            return LoadOutcome::Discarded;
        }
        match result {
            Ok(locator) => {
                state.content_locator = Some(locator);
                state.content_status = ContentStatus::Ready;
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(document_id = %ticket.document_id, error = %err, "content unavailable");
                state.content_locator = None;
                state.content_status = ContentStatus::Unavailable;
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    /// Picks up server-side changes (indexing status) to the selected document from a
    /// fresh listing. Does not start any loads.
    pub fn refresh_snapshot(&self, documents: &[Document]) -> bool {
        let mut state = self.state.lock();
        let Some(selected) = state.selected.as_mut() else {
            return false;
        };
        match documents.iter().find(|doc| doc.id == selected.id) {
            Some(fresh) if *fresh != *selected => {
                debug!(
                    document_id = %fresh.id,
                    status = fresh.indexing_status.as_str(),
                    "selected document snapshot updated"
                );
                *selected = fresh.clone();
                true
            }
            _ => false,
        }
    }
}
