//! HTTP API for herald
//!
//! Producers enqueue mailings with `POST /mailing`, which also wakes the
//! delivery worker. Entries can be listed page by page or fetched by id.

mod config;
mod error;
mod handlers;
mod server;

pub use config::ApiConfig;
pub use error::{ApiError, RequestError};
pub use handlers::{AppState, EntrySummary, MailingPage, NewMailing, NewReceiver};
pub use server::{ApiServer, router};
