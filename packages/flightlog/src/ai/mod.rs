//! OpenAI-backed implementations of the collaborator traits.

mod openai;

pub use openai::{OpenAIChat, OpenAIExtractor};
