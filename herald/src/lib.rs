//! Herald: an outbound mailing queue
//!
//! Mailings are accepted over HTTP, stored in a durable queue and delivered by
//! a single background worker that retries failed receivers a bounded number
//! of times.

pub mod controller;

pub use controller::{Herald, SHUTDOWN_BROADCAST};
