pub mod retry;
mod zhipu;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use zhipu::ZhipuProvider;
