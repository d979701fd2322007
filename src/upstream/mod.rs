//! Upstream Module
//!
//! Retrying, breaker-aware client for the chat-completion API.

mod executor;
mod retry;

pub use executor::{Executor, UpstreamTarget};
pub use retry::{decide, AttemptOutcome, Decision, RetryPolicy};
