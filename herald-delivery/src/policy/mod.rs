//! Delivery policies
//!
//! - `retry`: how many failed attempts an entry gets before it is given up on

pub mod retry;

pub use retry::RetryPolicy;
