//! Core config, errors, and file-backed JSON documents for Command Center.

pub mod config;
pub mod document;
pub mod error;
pub mod status;
pub mod time;
