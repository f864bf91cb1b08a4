//! Delivery worker and mail transports
//!
//! This crate provides functionality to:
//! - Drain the queue of pending mailings with a single background worker
//! - Track delivery attempts and give up after a bounded number of failures
//! - Deliver mailings through an SMTP relay, receiver by receiver

mod error;
pub mod policy;
mod processor;
pub mod transport;

// Re-export error types
pub use error::{PermanentError, SystemError, TemporaryError, TransportError};
pub use policy::RetryPolicy;
// Re-export worker types
pub use processor::{
    DeliveryConfig, DeliveryWorker,
    handle::{WakeSignal, WorkerHandle},
    process::{StepOutcome, apply_delivery_result},
};
pub use transport::{
    FailedReceiver, LogTransport, MailTransport, PartialDeliveryFailure, SmtpConfig,
    SmtpTransport, TlsMode, TransportConfig,
};
