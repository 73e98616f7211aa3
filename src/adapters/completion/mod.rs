pub mod anthropic;
pub mod errors;
pub mod rate_limiter;
pub mod retry;
pub mod scripted;

pub use anthropic::AnthropicCompletionClient;
pub use errors::AnthropicError;
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
pub use scripted::ScriptedCompletionClient;
