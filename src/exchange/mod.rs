//! Request/response exchange with the counterparty agent.
//!
//! One exchange sends a text request and waits for one text reply. The
//! counterparty may hand back a conversation id; callers pass it on later
//! exchanges to keep the conversation continuous.

pub mod a2a;

pub use a2a::{A2aClient, DEFAULT_EXCHANGE_TIMEOUT};

use async_trait::async_trait;

use crate::error::ExchangeError;

/// Reply from one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterpartyReply {
    /// First text part of the reply, or empty when there is none.
    pub text: String,
    /// Conversation id assigned by the counterparty, if any.
    pub context_id: Option<String>,
}

/// A counterparty that answers text requests.
#[async_trait]
pub trait Counterparty: Send + Sync {
    /// Sends `text` to the agent at `endpoint`, continuing `context_id` when given.
    async fn send(
        &self,
        endpoint: &str,
        text: &str,
        context_id: Option<&str>,
    ) -> Result<CounterpartyReply, ExchangeError>;
}
