//! LLM integration for deckbench.
//!
//! The responder asks a chat-completion model for a changeset. The
//! [`LlmProvider`] trait is the seam tests mock; [`LiteLlmClient`] is the
//! OpenAI-compatible implementation.
//!
//! ```ignore
//! use deckbench::llm::{GenerationRequest, LiteLlmClient, LlmProvider, Message, DEFAULT_LLM_TIMEOUT};
//!
//! let client = LiteLlmClient::new("http://localhost:4000", None, "openai/gpt-5.2", DEFAULT_LLM_TIMEOUT)?;
//! let request = GenerationRequest::new("", vec![Message::user("Hello!")]).with_temperature(0.0);
//! let response = client.generate(request).await?;
//! ```

pub mod litellm;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message, Usage,
    DEFAULT_LLM_TIMEOUT,
};
