pub mod channel;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod handler;
pub mod message;
pub mod metrics_defs;
pub mod schema;
pub mod slack;
pub mod sns;

#[cfg(test)]
mod testutils;

pub use errors::RelayError;
pub use handler::{InvocationResult, Relay};
