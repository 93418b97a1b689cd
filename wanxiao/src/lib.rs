//! Client and response parser for the 17wanxiao smart water and electricity service.
//!
//! The service answers with a JSON envelope whose `body` field is itself a JSON-encoded string,
//! and the fields inside that body vary between deployments. [`types`] holds the tolerant parser,
//! [`client`] the HTTP side.

// Allow repetition of structure name instead of replacing with self as the output from
// rust-analyzer becomes more readable
#![allow(clippy::use_self)]

#[cfg(feature = "client")]
pub mod client;
mod error;
pub mod types;

#[cfg(feature = "client")]
pub use client::Client;
pub use error::Error;
pub use types::{DailyUsage, Envelope, Room, Usage};
