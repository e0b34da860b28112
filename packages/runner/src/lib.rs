//! Client side of interactive runs: a terminal-like session against a
//! transient execution sandbox, spoken as JSON text frames.

pub mod config;
pub mod error;
pub mod input;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::RunnerConfig;
pub use error::RunnerError;
pub use input::InputQueue;
pub use protocol::{ClientMessage, CodeMessage, ServerMessage};
pub use session::{RunInput, RunSession, SessionEnd, SessionEvent};
pub use transport::{JsonFramed, RunTransport};
