//! Command handlers.

pub mod upload;
