//! # gb-state-memory
//!
//! Process-local implementations of `SessionStore` and `RateLimiter`.
//! Nothing here survives a restart.

pub mod ratelimit;
pub mod session;

pub use ratelimit::{RateLimitConfig, SlidingWindowLimiter, SweepHandle, DEFAULT_SWEEP_INTERVAL};
pub use session::MemorySessionStore;
