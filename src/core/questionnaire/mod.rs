mod lifecycle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use lifecycle::{can_transition, status_after_deployment};

/// Question kind. Unknown type strings are kept verbatim and compile like
/// open-ended questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Rating,
    #[default]
    OpenEnded,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Rating => "rating",
            QuestionType::OpenEnded => "open_ended",
            QuestionType::Other(raw) => raw,
        }
    }
}

impl From<String> for QuestionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "rating" => QuestionType::Rating,
            "open_ended" => QuestionType::OpenEnded,
            _ => QuestionType::Other(value),
        }
    }
}

impl From<QuestionType> for String {
    fn from(value: QuestionType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    /// Reserved for choice questions; the flow compiler does not read it yet.
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionnaireStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "Running")]
    Running,
    #[serde(rename = "Stopped")]
    Stopped,
    #[serde(rename = "Complete")]
    Complete,
}

impl QuestionnaireStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionnaireStatus::NotStarted => "Not Started",
            QuestionnaireStatus::Running => "Running",
            QuestionnaireStatus::Stopped => "Stopped",
            QuestionnaireStatus::Complete => "Complete",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "Not Started" => Some(QuestionnaireStatus::NotStarted),
            "Running" => Some(QuestionnaireStatus::Running),
            "Stopped" => Some(QuestionnaireStatus::Stopped),
            "Complete" => Some(QuestionnaireStatus::Complete),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QuestionnaireStatus::Stopped | QuestionnaireStatus::Complete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub status: QuestionnaireStatus,
}

/// Client-supplied part of a questionnaire, used for create and replace.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestionnaire {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Questionnaire {
    pub fn create(input: NewQuestionnaire) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            questions: input.questions,
            created_at: Utc::now(),
            status: QuestionnaireStatus::NotStarted,
        }
    }

    /// New revision with the caller's title and questions; identity,
    /// creation time and status carry over.
    pub fn revise(&self, input: NewQuestionnaire) -> Self {
        Self {
            id: self.id.clone(),
            title: input.title,
            questions: input.questions,
            created_at: self.created_at,
            status: self.status,
        }
    }
}
