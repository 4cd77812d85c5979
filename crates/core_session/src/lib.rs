//! Client-side interaction state for the document workspace.
//!
//! Every component owns its state behind a shared handle and never holds a lock
//! across a backend call. Results of calls that target the selected document are
//! applied only if that selection is still current when the call completes.

mod analysis;
mod browser;
mod chat;
mod debounce;
mod models;
mod rag;
mod selection;
mod workspace;

#[cfg(test)]
mod testing;

pub use analysis::{ANALYSIS_FAILED_TEXT, AnalysisLoader, AnalysisState};
pub use browser::DocumentBrowser;
pub use chat::{ChatSession, HistoryStatus, SkipReason, SubmitOutcome, Transcript};
pub use debounce::Debouncer;
pub use models::{ModelSelector, ModelsStatus};
pub use rag::{RagSearch, SearchOutcome};
pub use selection::{ContentStatus, DocumentSelection, SelectionTicket};
pub use workspace::{SelectionOutcome, Workspace, WorkspaceOptions, WorkspaceSnapshot};

/// How a background load ended, from the point of view of the component that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// Nothing was fetched: cached, already in flight, or nothing to load.
    Skipped,
    /// The result arrived after its target stopped being current and was dropped.
    Discarded,
    Failed(String),
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied)
    }
}
