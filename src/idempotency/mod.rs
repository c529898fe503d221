//! Idempotency module
//!
//! Prevents duplicate request processing using idempotency keys.

mod resolver;

pub use resolver::{request_fingerprint, IdempotencyResolver};
