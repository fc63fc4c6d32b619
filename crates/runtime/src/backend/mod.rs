//! LLM backend abstraction.
//!
//! One prompt in, free text out. The selection layer never sees provider
//! details; swapping providers means swapping this trait's implementation.

mod gemini;

pub use gemini::{GeminiBackend, GeminiBackendBuilder};

use crate::Result;
use std::future::Future;

/// Trait for LLM backends.
///
/// Implementations handle the specifics of one provider's completion API.
pub trait LlmBackend: Send + Sync {
    /// Send a single prompt and return the model's text reply.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}
