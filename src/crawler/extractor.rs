//! Question extraction from the JSON + HTML hybrid response
//!
//! The response body is a JSON envelope with a numeric `questionId` and a `questionHTML`
//! string holding a rendered HTML fragment. The fragment is read in one forward pass over
//! its tag stream, without building a DOM.
//!
//! The page template emits every answer's fields in a fixed order:
//!
//! 1. `<div id="answer-N">` carries the answer ID
//! 2. `<script type="application/ld+json">` carries the answer payload
//! 3. `<a class="answer__account-username" href="/account/N">` carries the author ID
//!
//! The author link closes the answer. Nothing validates this order: reordered or
//! interleaved markup silently produces wrong answers.

use crate::model::{Answer, Question, QuestionId};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Envelope field holding the question ID
pub const QUESTION_ID_FIELD: &str = "questionId";

/// Envelope field holding the embedded HTML fragment
pub const QUESTION_HTML_FIELD: &str = "questionHTML";

/// Attribute of the container holding the question payload
pub const QUESTION_PAYLOAD_ATTR: &str = "question-data";

/// Script type marking an answer's structured-data payload
pub const DATA_SCRIPT_TYPE: &str = "application/ld+json";

/// Class of the link pointing at an answer author's profile
pub const AUTHOR_LINK_CLASS: &str = "answer__account-username";

const ANSWER_ID_PATTERN: &str = r"^answer-(\d+)$";
const AUTHOR_HREF_PATTERN: &str = r"^/account/(\d+)";

/// Errors that make a response body unusable
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Response is not a JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Envelope is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Envelope field '{0}' has an unexpected value")]
    InvalidField(&'static str),
}

/// The decoded outer layer of a question response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionEnvelope {
    /// Question ID as reported by the site
    pub id: QuestionId,

    /// Embedded HTML fragment
    pub html: String,
}

impl QuestionEnvelope {
    /// Decodes the envelope, requiring both the ID and the HTML field
    pub fn decode(body: &[u8]) -> Result<Self, ExtractError> {
        let mut fields: Map<String, Value> = serde_json::from_slice(body)?;

        let id = match fields.remove(QUESTION_ID_FIELD) {
            None | Some(Value::Null) => return Err(ExtractError::MissingField(QUESTION_ID_FIELD)),
            Some(Value::Number(n)) => number_to_id(&n)
                .ok_or(ExtractError::InvalidField(QUESTION_ID_FIELD))?,
            Some(_) => return Err(ExtractError::InvalidField(QUESTION_ID_FIELD)),
        };

        let html = match fields.remove(QUESTION_HTML_FIELD) {
            None | Some(Value::Null) => {
                return Err(ExtractError::MissingField(QUESTION_HTML_FIELD))
            }
            Some(Value::String(html)) => html,
            Some(_) => return Err(ExtractError::InvalidField(QUESTION_HTML_FIELD)),
        };

        Ok(Self { id, html })
    }
}

/// Accepts positive integers, including integral floats such as `42.0`
fn number_to_id(n: &serde_json::Number) -> Option<QuestionId> {
    let id = match n.as_u64() {
        Some(id) => id,
        None => {
            let f = n.as_f64()?;
            if !f.is_finite() || f.fract() != 0.0 || f < 1.0 || f > u64::MAX as f64 {
                return None;
            }
            f as u64
        }
    };
    (id > 0).then_some(id)
}

/// A field found for the answer currently being assembled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerEvent {
    /// Digits of an `answer-N` container id
    Id(u64),

    /// Text of a structured-data script
    Payload(String),

    /// Digits of an author profile link; completes the answer
    Author(u64),
}

/// The answer being assembled during the token scan
///
/// Transition table:
///
/// | state     | `Id` / `Payload`          | `Author`                          |
/// |-----------|---------------------------|-----------------------------------|
/// | `Empty`   | `Partial` with that field | emit answer, back to `Empty`      |
/// | `Partial` | `Partial`, field replaced | emit answer, back to `Empty`      |
///
/// A `Partial` answer left over at the end of the fragment is discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingAnswer {
    #[default]
    Empty,
    Partial(Answer),
}

impl PendingAnswer {
    /// Applies one event, returning the next state and the answer it completed, if any
    pub fn apply(self, event: AnswerEvent) -> (PendingAnswer, Option<Answer>) {
        let mut answer = match self {
            Self::Empty => Answer::default(),
            Self::Partial(answer) => answer,
        };

        match event {
            AnswerEvent::Id(id) => {
                answer.id = id;
                (Self::Partial(answer), None)
            }
            AnswerEvent::Payload(payload) => {
                answer.payload = payload;
                (Self::Partial(answer), None)
            }
            AnswerEvent::Author(author_id) => {
                answer.author_id = author_id;
                (Self::Empty, Some(answer))
            }
        }
    }
}

/// Turns question responses into [`Question`] records
///
/// The matching patterns are compiled once here and shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    answer_id: Regex,
    author_href: Regex,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            answer_id: Regex::new(ANSWER_ID_PATTERN).expect("answer id pattern is valid"),
            author_href: Regex::new(AUTHOR_HREF_PATTERN).expect("author href pattern is valid"),
        }
    }

    /// Decodes a raw response body and extracts the question from it
    pub fn extract(&self, body: &[u8]) -> Result<Question, ExtractError> {
        let envelope = QuestionEnvelope::decode(body)?;
        Ok(self.extract_envelope(&envelope))
    }

    /// Extracts the question from an already decoded envelope
    pub fn extract_envelope(&self, envelope: &QuestionEnvelope) -> Question {
        self.extract_fragment(envelope.id, &envelope.html)
    }

    /// Runs the single-pass scan over an HTML fragment
    ///
    /// Malformed answer fields keep their zero value; the scan itself never fails.
    pub fn extract_fragment(&self, id: QuestionId, html: &str) -> Question {
        let mut input = BufferQueue::new();
        input.push_back(StrTendril::from_slice(html));

        let mut tokenizer = Tokenizer::new(QuestionSink::new(self), TokenizerOpts::default());
        // Feeding only pauses when the sink requests a script pause, which QuestionSink never does
        while let TokenizerResult::Script(()) = tokenizer.feed(&mut input) {}
        tokenizer.end();

        let sink = tokenizer.sink;
        if sink.pending != PendingAnswer::Empty {
            tracing::debug!("Question {}: discarding incomplete trailing answer", id);
        }

        Question {
            id,
            payload: sink.payload,
            answers: sink.answers,
        }
    }

    fn parse_answer_id(&self, value: &str) -> Option<u64> {
        capture_number(&self.answer_id, value)
    }

    fn parse_author_id(&self, href: &str) -> Option<u64> {
        capture_number(&self.author_href, href)
    }
}

fn capture_number(pattern: &Regex, value: &str) -> Option<u64> {
    pattern
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

fn attr<'t>(tag: &'t Tag, name: &str) -> Option<&'t str> {
    tag.attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

fn has_class(tag: &Tag, class: &str) -> bool {
    attr(tag, "class").is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
}

/// Token sink collecting the question while the tokenizer runs
struct QuestionSink<'e> {
    extractor: &'e ContentExtractor,
    payload: String,
    answers: Vec<Answer>,
    pending: PendingAnswer,
    /// Text of the data script being read, if inside one
    script_text: Option<String>,
}

impl<'e> QuestionSink<'e> {
    fn new(extractor: &'e ContentExtractor) -> Self {
        Self {
            extractor,
            payload: String::new(),
            answers: Vec::new(),
            pending: PendingAnswer::Empty,
            script_text: None,
        }
    }

    fn advance(&mut self, event: AnswerEvent) {
        let (next, completed) = std::mem::take(&mut self.pending).apply(event);
        self.pending = next;
        if let Some(answer) = completed {
            self.answers.push(answer);
        }
    }

    fn finish_script(&mut self) {
        if let Some(text) = self.script_text.take() {
            self.advance(AnswerEvent::Payload(text));
        }
    }

    fn start_tag(&mut self, tag: &Tag) -> TokenSinkResult<()> {
        match &*tag.name {
            "div" => {
                if let Some(payload) = attr(tag, QUESTION_PAYLOAD_ATTR) {
                    self.payload = payload.to_string();
                } else if let Some(id) = attr(tag, "id").and_then(|v| self.extractor.parse_answer_id(v))
                {
                    self.advance(AnswerEvent::Id(id));
                }
            }
            "script" => {
                if attr(tag, "type").is_some_and(|t| t.trim().eq_ignore_ascii_case(DATA_SCRIPT_TYPE)) {
                    self.script_text = Some(String::new());
                }
                // Script bodies are raw text; without this the tokenizer would read tags in them
                return TokenSinkResult::RawData(RawKind::ScriptData);
            }
            "style" => return TokenSinkResult::RawData(RawKind::Rawtext),
            "a" => {
                if has_class(tag, AUTHOR_LINK_CLASS) {
                    if let Some(author_id) =
                        attr(tag, "href").and_then(|href| self.extractor.parse_author_id(href))
                    {
                        self.advance(AnswerEvent::Author(author_id));
                    }
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for QuestionSink<'_> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => {
                self.finish_script();
                if tag.kind == TagKind::StartTag {
                    return self.start_tag(&tag);
                }
            }
            Token::CharacterTokens(text) => {
                if let Some(script) = self.script_text.as_mut() {
                    script.push_str(&text);
                }
            }
            Token::EOFToken => self.finish_script(),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}
