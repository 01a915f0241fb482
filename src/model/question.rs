/// Numeric question identifier as used by the target site
pub type QuestionId = u64;

/// A question as extracted from one fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question ID reported by the response envelope
    pub id: QuestionId,

    /// Raw question payload, captured verbatim from the page
    pub payload: String,

    /// Completed answers in document order
    pub answers: Vec<Answer>,
}

/// An answer attached to a question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    /// Answer ID parsed from the `answer-<digits>` container id
    pub id: u64,

    /// Author account ID parsed from the profile link
    pub author_id: u64,

    /// Raw structured-data blob of the answer
    pub payload: String,
}

impl Question {
    /// Builds the stub stored for a question the site reports as missing
    ///
    /// Stubs are persisted so that later gap scans do not request the ID again.
    pub fn empty(id: QuestionId) -> Self {
        Self {
            id,
            payload: String::new(),
            answers: Vec::new(),
        }
    }

    /// Returns true if the question carries no content at all
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty() && self.answers.is_empty()
    }
}
