//! Shared building blocks for the Simple Slack notifier: configuration, the
//! environment snapshot used for templating, request types and errors.

pub mod config;
pub mod env;
pub mod error;
pub mod types;
