//! User interfaces outside the HTTP API

#[cfg(feature = "cli")]
pub mod cli;
