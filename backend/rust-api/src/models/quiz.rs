use serde::{Deserialize, Serialize};

/// A quiz is the authoritative question container behind one training module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Creation-timestamp-derived (millisecond) id, unique across all quizzes.
    pub id: i64,
    pub category: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl Question {
    /// A question is well formed when its correct answer is one of its own options.
    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty()
            && !self.options.is_empty()
            && self.options.iter().any(|option| option == &self.correct_answer)
    }
}

/// Bulk import/export shape used by the admin content tool: a sub-topic name
/// maps to bare questions; ids and category are assigned on import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FolderQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}
