//! Async client handle for an RTS connection.
//!
//! The connection runs inside a tokio task; [`RtsClient`] talks to it over
//! channels so it can be cloned into as many tasks as needed.

mod driver;
#[allow(clippy::module_inception)]
mod client;

pub use client::{ClientError, RtsClient};
