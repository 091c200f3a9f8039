//! Core domain + application logic for the base calculator bot.
//!
//! This crate is framework-agnostic. The chat platform lives behind the
//! `MessagingPort` trait implemented in adapter crates.

pub mod arithmetic;
pub mod audit;
pub mod calculator;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod radix;
pub mod security;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
