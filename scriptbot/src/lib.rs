//! An IRC bot that exposes small scripts as chat commands, most notably electricity balance
//! queries for campus dormitories.

pub mod command;
pub mod config;
pub mod consts;
pub mod context;
mod error;
pub mod http;
pub mod plugin;
mod scriptbot;
pub mod telemetry;

pub use config::Config;
pub use context::Context;
pub use error::Error;
pub use plugin::{Plugin, Registry};
pub use scriptbot::ScriptBot;
