//! # beard-std
//!
//! Standard implementations for the beard chat plugin framework.
//!
//! This crate provides:
//! - **Commands**: [`Command`](command::Command), binding a trigger to a handler
//! - **Predicates**: slash commands, anchored regular expressions, content filters
//! - **Storage**: an in-memory [`TableStore`](beard_core::TableStore)
//! - **Testing**: a recording transport and message builders

#![deny(clippy::wildcard_imports)]

// Re-export core types
pub use beard_core;

// Modules
pub mod command;
pub mod predicates;
pub mod storage;
pub mod testing;
