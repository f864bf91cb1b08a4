pub mod logging;

pub use tracing;

/// Process-wide lifecycle signal broadcast to long-running components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
