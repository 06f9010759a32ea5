pub mod client;
pub mod retry;

pub use client::RateLimitedHttpClient;
pub use retry::{send_with_retry, RetryConfig};
