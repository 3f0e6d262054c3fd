//! HTTP session manager
//!
//! - [`HttpSession`]: one pooled client per run, shared by all workers
//! - [`RetryPolicy`]: which failures are retried and the backoff schedule

pub mod retry;
pub mod session;

pub use retry::RetryPolicy;
pub use session::HttpSession;
