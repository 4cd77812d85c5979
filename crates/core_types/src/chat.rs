use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Client-side id for optimistic entries. Random, so two entries created in the
    /// same instant still get distinct keys.
    pub fn local() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Score in `[0, 1]`. Out of range and NaN inputs are clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answered { confidence: Confidence },
    /// The backend declined to answer or the request never completed; no confidence applies.
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    Question {
        id: MessageId,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_id: Option<String>,
        created_at: DateTime<Utc>,
    },
    Answer {
        id: MessageId,
        text: String,
        outcome: AnswerOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_name: Option<String>,
        created_at: DateTime<Utc>,
    },
}

pub const ANSWER_FAILED_TEXT: &str =
    "Sorry, I couldn't get an answer for that question. Please try again.";

impl ChatMessage {
    pub fn question(text: impl Into<String>, model_id: impl Into<String>) -> Self {
        ChatMessage::Question {
            id: MessageId::local(),
            text: text.into(),
            model_id: Some(model_id.into()),
            created_at: Utc::now(),
        }
    }

    pub fn answer(response: AskResponse) -> Self {
        let outcome = if response.success {
            AnswerOutcome::Answered {
                confidence: Confidence::new(response.confidence),
            }
        } else {
            AnswerOutcome::Unanswered
        };
        ChatMessage::Answer {
            id: MessageId::local(),
            text: response.answer,
            outcome,
            model_name: Some(response.model_name),
            created_at: Utc::now(),
        }
    }

    pub fn failed_answer() -> Self {
        ChatMessage::Answer {
            id: MessageId::local(),
            text: ANSWER_FAILED_TEXT.to_owned(),
            outcome: AnswerOutcome::Unanswered,
            model_name: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &MessageId {
        match self {
            ChatMessage::Question { id, .. } | ChatMessage::Answer { id, .. } => id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ChatMessage::Question { text, .. } | ChatMessage::Answer { text, .. } => text,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ChatMessage::Question { created_at, .. } | ChatMessage::Answer { created_at, .. } => {
                *created_at
            }
        }
    }

    pub fn is_question(&self) -> bool {
        matches!(self, ChatMessage::Question { .. })
    }

    /// `None` for questions; for answers, whether the backend produced a usable answer.
    pub fn success(&self) -> Option<bool> {
        match self {
            ChatMessage::Question { .. } => None,
            ChatMessage::Answer { outcome, .. } => {
                Some(matches!(outcome, AnswerOutcome::Answered { .. }))
            }
        }
    }

    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            ChatMessage::Answer {
                outcome: AnswerOutcome::Answered { confidence },
                ..
            } => Some(*confidence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub confidence: f64,
    pub success: bool,
    pub model_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_answer_keeps_confidence() {
        let message = ChatMessage::answer(AskResponse {
            answer: "Either party may terminate with 30 days notice.".to_owned(),
            confidence: 0.87,
            success: true,
            model_name: "m1".to_owned(),
        });
        assert_eq!(message.success(), Some(true));
        assert_eq!(message.confidence().map(Confidence::percent), Some(87));
        assert!(message.id().as_str().starts_with("local-"));
    }

    #[test]
    fn unsuccessful_answer_drops_confidence() {
        let message = ChatMessage::answer(AskResponse {
            answer: "not confident".to_owned(),
            confidence: 0.04,
            success: false,
            model_name: "m1".to_owned(),
        });
        assert_eq!(message.success(), Some(false));
        assert_eq!(message.confidence(), None);
    }

    #[test]
    fn local_ids_do_not_collide() {
        let a = ChatMessage::question("q", "m1");
        let b = ChatMessage::question("q", "m1");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.success(), None);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::new(0.91).to_string(), "91%");
    }
}
