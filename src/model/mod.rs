//! Core data model
//!
//! Questions and answers are built once per fetch, handed to storage and dropped.
//! Proxy descriptors are loaded once at startup and never change afterwards.

mod proxy;
mod question;

pub use proxy::ProxyDescriptor;
pub use question::{Answer, Question, QuestionId};
