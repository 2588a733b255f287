pub mod llm;

pub use llm::{AnthropicProvider, LLMProvider, Message};
