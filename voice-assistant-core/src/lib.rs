//! Core types and configuration for voice-assistant
//!
//! This crate provides the configuration layer, logging setup, error type and
//! the persisted conversation state shared by the other voice-assistant crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
