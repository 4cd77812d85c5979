use std::sync::Arc;

use core_types::{ChatMessage, DocumentApi, DocumentId};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::LoadOutcome;
use crate::selection::{DocumentSelection, SelectionTicket};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoDocument,
    BlankQuestion,
    NoModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Skipped(SkipReason),
    /// The backend answered; `success` mirrors the answer's success flag.
    Answered { success: bool },
    /// The request failed and a failure entry was appended.
    Failed(String),
    /// The selection changed before the reply arrived; nothing was appended.
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub document_id: Option<DocumentId>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
struct ChatState {
    ticket: Option<SelectionTicket>,
    messages: Vec<ChatMessage>,
    history: HistoryStatus,
    draft: String,
    pending: usize,
}

impl ChatState {
    fn owns(&self, ticket: &SelectionTicket) -> bool {
        self.ticket.as_ref() == Some(ticket)
    }
}

/// Appends turns made while the history was loading. The backend stores a question
/// together with its answer, so local entries already present at the end of the
/// history are dropped; unanswered and failed turns are kept.
fn merge_history(mut history: Vec<ChatMessage>, local: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let tail_start = history.len().saturating_sub(local.len());
    let mut covered = vec![false; history.len() - tail_start];
    let fresh: Vec<ChatMessage> = local
        .into_iter()
        .filter(|message| {
            let hit = history[tail_start..]
                .iter()
                .enumerate()
                .position(|(i, stored)| !covered[i] && same_turn(stored, message));
            match hit {
                Some(i) => {
                    covered[i] = true;
                    false
                }
                None => true,
            }
        })
        .collect();
    history.extend(fresh);
    history
}

fn same_turn(a: &ChatMessage, b: &ChatMessage) -> bool {
    a.is_question() == b.is_question() && a.text() == b.text()
}

struct PendingQuestion {
    ticket: SelectionTicket,
    question: String,
    model_id: String,
}

/// Question/answer transcript for the selected document.
#[derive(Clone)]
pub struct ChatSession {
    api: Arc<dyn DocumentApi>,
    selection: DocumentSelection,
    state: Arc<Mutex<ChatState>>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn DocumentApi>, selection: DocumentSelection) -> Self {
        Self {
            api,
            selection,
            state: Arc::new(Mutex::new(ChatState::default())),
        }
    }

    pub fn transcript(&self) -> Transcript {
        let state = self.state.lock();
        Transcript {
            document_id: state.ticket.as_ref().map(|t| t.document_id().clone()),
            messages: state.messages.clone(),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.state.lock().history
    }

    pub fn pending_questions(&self) -> usize {
        self.state.lock().pending
    }

    pub fn draft(&self) -> String {
        self.state.lock().draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().draft = text.into();
    }

    /// Empties the transcript for a new selection. The previous document's messages
    /// must not stay visible, even if the history fetch later fails.
    pub fn reset_for(&self, ticket: &SelectionTicket) {
        let mut state = self.state.lock();
        state.ticket = Some(ticket.clone());
        state.messages.clear();
        state.history = HistoryStatus::Loading;
        state.pending = 0;
    }

    pub async fn load_history(&self, ticket: &SelectionTicket) -> LoadOutcome {
        let result = self.api.chat_history(ticket.document_id()).await;

        let current = self.selection.is_current(ticket);
        let mut state = self.state.lock();
        if !current || !state.owns(ticket) {
            debug!(document_id = %ticket.document_id(), "discarding stale chat history");
            return LoadOutcome::Discarded;
        }
        match result {
            Ok(history) => {
                let local = std::mem::take(&mut state.messages);
                state.messages = merge_history(history, local);
                state.history = HistoryStatus::Loaded;
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(document_id = %ticket.document_id(), error = %err, "chat history unavailable");
                state.history = HistoryStatus::Failed;
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    /// Appends the question right away, clears the draft, then appends the answer (or
    /// a failure entry) once the backend replies. Several questions may be in flight;
    /// their answers land in completion order.
    pub async fn submit_question(&self, text: &str, model_id: Option<&str>) -> SubmitOutcome {
        let pending = match self.begin_question(text, model_id) {
            Ok(pending) => pending,
            Err(reason) => return SubmitOutcome::Skipped(reason),
        };

        let result = self
            .api
            .ask_question(
                pending.ticket.document_id(),
                &pending.question,
                &pending.model_id,
            )
            .await;

        let current = self.selection.is_current(&pending.ticket);
        let mut state = self.state.lock();
        if !current || !state.owns(&pending.ticket) {
            debug!(document_id = %pending.ticket.document_id(), "discarding answer for previous selection");
            return SubmitOutcome::Discarded;
        }
        state.pending = state.pending.saturating_sub(1);
        match result {
            Ok(response) => {
                let success = response.success;
                info!(
                    document_id = %pending.ticket.document_id(),
                    model_id = %pending.model_id,
                    success,
                    confidence = response.confidence,
                    "question answered"
                );
                state.messages.push(ChatMessage::answer(response));
                SubmitOutcome::Answered { success }
            }
            Err(err) => {
                warn!(document_id = %pending.ticket.document_id(), error = %err, "question failed");
                state.messages.push(ChatMessage::failed_answer());
                SubmitOutcome::Failed(err.to_string())
            }
        }
    }

    fn begin_question(
        &self,
        text: &str,
        model_id: Option<&str>,
    ) -> Result<PendingQuestion, SkipReason> {
        let ticket = self
            .selection
            .current_ticket()
            .ok_or(SkipReason::NoDocument)?;
        let question = text.trim();
        if question.is_empty() {
            return Err(SkipReason::BlankQuestion);
        }
        let model_id = model_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(SkipReason::NoModel)?;

        let mut state = self.state.lock();
        if !state.owns(&ticket) {
            return Err(SkipReason::NoDocument);
        }
        state
            .messages
            .push(ChatMessage::question(question, model_id));
        state.draft.clear();
        state.pending += 1;
        Ok(PendingQuestion {
            ticket,
            question: question.to_owned(),
            model_id: model_id.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedApi, document};
    use core_types::{ANSWER_FAILED_TEXT, AskResponse, Confidence};

    fn session(api: &Arc<ScriptedApi>) -> (DocumentSelection, ChatSession) {
        let selection = DocumentSelection::new(api.clone());
        let chat = ChatSession::new(api.clone(), selection.clone());
        (selection, chat)
    }

    async fn select(selection: &DocumentSelection, chat: &ChatSession, id: &str) -> LoadOutcome {
        let ticket = selection.begin(document(id, &format!("{id}.pdf")));
        chat.reset_for(&ticket);
        chat.load_history(&ticket).await
    }

    #[tokio::test]
    async fn question_then_answer_with_confidence() {
        let api = Arc::new(ScriptedApi::default());
        api.set_answer(
            "What is the termination clause?",
            AskResponse {
                answer: "Either party may terminate with 30 days notice.".to_owned(),
                confidence: 0.87,
                success: true,
                model_name: "m1".to_owned(),
            },
        );
        let (selection, chat) = session(&api);
        select(&selection, &chat, "d1").await;

        chat.set_draft("What is the termination clause?");
        let outcome = chat
            .submit_question(&chat.draft(), Some("m1"))
            .await;
        assert_eq!(outcome, SubmitOutcome::Answered { success: true });
        assert!(chat.draft().is_empty());

        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_question());
        assert_eq!(messages[0].text(), "What is the termination clause?");
        assert_eq!(messages[1].confidence(), Some(Confidence::new(0.87)));
        assert_ne!(messages[0].id(), messages[1].id());
    }

    #[tokio::test]
    async fn question_is_visible_before_answer_arrives() {
        let api = Arc::new(ScriptedApi::default());
        api.hold("ask:slow?");
        let (selection, chat) = session(&api);
        select(&selection, &chat, "d1").await;
        chat.set_draft("slow?");

        let task = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit_question("slow?", Some("m1")).await }
        });
        api.wait_for_call("ask:slow?").await;

        assert_eq!(chat.messages().len(), 1);
        assert!(chat.messages()[0].is_question());
        assert!(chat.draft().is_empty());
        assert_eq!(chat.pending_questions(), 1);

        api.release("ask:slow?");
        assert_eq!(task.await.expect("join"), SubmitOutcome::Answered { success: true });
        assert_eq!(chat.pending_questions(), 0);
        assert!(!chat.messages()[1].is_question());
    }

    #[tokio::test]
    async fn answers_land_in_completion_order() {
        let api = Arc::new(ScriptedApi::default());
        api.hold("ask:first");
        let (selection, chat) = session(&api);
        select(&selection, &chat, "d1").await;

        let first = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit_question("first", Some("m1")).await }
        });
        api.wait_for_call("ask:first").await;
        chat.submit_question("second", Some("m1")).await;
        api.release("ask:first");
        first.await.expect("join");

        let texts: Vec<_> = chat.messages().iter().map(|m| m.text().to_owned()).collect();
        assert_eq!(
            texts,
            ["first", "second", "answer to second", "answer to first"]
        );
    }

    #[tokio::test]
    async fn failed_request_appends_failure_entry() {
        let api = Arc::new(ScriptedApi::default());
        api.fail("ask:broken");
        let (selection, chat) = session(&api);
        select(&selection, &chat, "d1").await;

        let outcome = chat.submit_question("broken", Some("m1")).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text(), ANSWER_FAILED_TEXT);
        assert_eq!(messages[1].success(), Some(false));
        assert_eq!(messages[1].confidence(), None);
    }

    #[tokio::test]
    async fn preconditions_make_submit_a_no_op() {
        let api = Arc::new(ScriptedApi::default());
        let (selection, chat) = session(&api);

        assert_eq!(
            chat.submit_question("hello", Some("m1")).await,
            SubmitOutcome::Skipped(SkipReason::NoDocument)
        );
        select(&selection, &chat, "d1").await;
        chat.set_draft("   ");
        assert_eq!(
            chat.submit_question("   ", Some("m1")).await,
            SubmitOutcome::Skipped(SkipReason::BlankQuestion)
        );
        assert_eq!(
            chat.submit_question("hello", Some("")).await,
            SubmitOutcome::Skipped(SkipReason::NoModel)
        );
        assert_eq!(
            chat.submit_question("hello", None).await,
            SubmitOutcome::Skipped(SkipReason::NoModel)
        );
        assert!(chat.messages().is_empty());
        assert_eq!(chat.draft(), "   ");
        assert!(api.calls().iter().all(|call| !call.starts_with("ask:")));
    }

    #[tokio::test]
    async fn switching_documents_replaces_transcript() {
        let api = Arc::new(ScriptedApi::default());
        api.set_history("x", vec![ChatMessage::question("about x", "m1")]);
        api.set_history("y", vec![ChatMessage::question("about y", "m1")]);
        let (selection, chat) = session(&api);

        select(&selection, &chat, "x").await;
        chat.submit_question("more about x", Some("m1")).await;
        assert_eq!(chat.messages().len(), 3);

        select(&selection, &chat, "y").await;
        let transcript = chat.transcript();
        assert_eq!(transcript.document_id, Some(DocumentId::from("y")));
        let texts: Vec<_> = transcript.messages.iter().map(|m| m.text()).collect();
        assert_eq!(texts, ["about y"]);
    }

    #[tokio::test]
    async fn history_failure_leaves_empty_transcript() {
        let api = Arc::new(ScriptedApi::default());
        api.set_history("x", vec![ChatMessage::question("about x", "m1")]);
        api.fail("history:y");
        let (selection, chat) = session(&api);

        select(&selection, &chat, "x").await;
        let outcome = select(&selection, &chat, "y").await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(chat.messages().is_empty());
        assert_eq!(chat.history_status(), HistoryStatus::Failed);
    }

    #[tokio::test]
    async fn late_answer_for_previous_document_is_dropped() {
        let api = Arc::new(ScriptedApi::default());
        api.hold("ask:on x");
        let (selection, chat) = session(&api);
        select(&selection, &chat, "x").await;

        let task = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit_question("on x", Some("m1")).await }
        });
        api.wait_for_call("ask:on x").await;
        select(&selection, &chat, "y").await;
        api.release("ask:on x");

        assert_eq!(task.await.expect("join"), SubmitOutcome::Discarded);
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn stale_history_does_not_overwrite_newer_selection() {
        let api = Arc::new(ScriptedApi::default());
        api.set_history("x", vec![ChatMessage::question("about x", "m1")]);
        api.hold("history:x");
        let (selection, chat) = session(&api);

        let slow = tokio::spawn({
            let (selection, chat) = (selection.clone(), chat.clone());
            async move { select(&selection, &chat, "x").await }
        });
        api.wait_for_call("history:x").await;
        select(&selection, &chat, "y").await;
        api.release("history:x");

        assert_eq!(slow.await.expect("join"), LoadOutcome::Discarded);
        assert!(chat.messages().is_empty());
        assert_eq!(chat.transcript().document_id, Some(DocumentId::from("y")));
    }

    #[tokio::test]
    async fn answered_turn_in_late_history_is_not_repeated() {
        let api = Arc::new(ScriptedApi::default());
        api.hold("history:x");
        let (selection, chat) = session(&api);

        let ticket = selection.begin(document("x", "x.pdf"));
        chat.reset_for(&ticket);
        let loading = tokio::spawn({
            let (chat, ticket) = (chat.clone(), ticket.clone());
            async move { chat.load_history(&ticket).await }
        });
        api.wait_for_call("history:x").await;
        chat.submit_question("now", Some("m1")).await;
        chat.submit_question("pending?", Some("m1")).await;

        // The backend persisted the first turn; the second was not stored yet.
        api.set_history(
            "x",
            vec![
                ChatMessage::question("earlier", "m1"),
                ChatMessage::question("now", "m1"),
                ChatMessage::answer(AskResponse {
                    answer: "answer to now".to_owned(),
                    confidence: 0.5,
                    success: true,
                    model_name: "m1".to_owned(),
                }),
            ],
        );
        api.release("history:x");
        assert_eq!(loading.await.expect("join"), LoadOutcome::Applied);

        let texts: Vec<_> = chat.messages().iter().map(|m| m.text().to_owned()).collect();
        assert_eq!(
            texts,
            ["earlier", "now", "answer to now", "pending?", "answer to pending?"]
        );
    }

    #[test]
    fn merge_keeps_repeated_question_not_yet_stored() {
        let history = vec![
            ChatMessage::question("again", "m1"),
            ChatMessage::failed_answer(),
        ];
        let local = vec![ChatMessage::question("again", "m1")];
        let merged = merge_history(history, local);
        assert_eq!(merged.len(), 3);
        assert!(merged[2].is_question());
    }

    #[tokio::test]
    async fn question_asked_before_history_arrives_is_kept() {
        let api = Arc::new(ScriptedApi::default());
        api.set_history("x", vec![ChatMessage::question("earlier", "m1")]);
        api.hold("history:x");
        let (selection, chat) = session(&api);

        let ticket = selection.begin(document("x", "x.pdf"));
        chat.reset_for(&ticket);
        let loading = tokio::spawn({
            let (chat, ticket) = (chat.clone(), ticket.clone());
            async move { chat.load_history(&ticket).await }
        });
        api.wait_for_call("history:x").await;
        chat.submit_question("now", Some("m1")).await;
        api.release("history:x");
        loading.await.expect("join");

        let texts: Vec<_> = chat.messages().iter().map(|m| m.text().to_owned()).collect();
        assert_eq!(texts, ["earlier", "now", "answer to now"]);
    }
}
