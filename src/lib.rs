//! BookHaven - online bookstore backend
//!
//! Catalog browsing, cart and wishlist, checkout with coupons and simulated
//! card payment, order tracking, and an admin surface, served as a JSON API.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Maintenance commands
//!
//! # Architecture
//! - `storage`: SeaORM models and queries
//! - `services`: Business rules (pricing, coupons, checkout, auth)
//! - `api`: HTTP handlers, middleware and JWT
//! - `interfaces`: CLI commands
//! - `config`: Static configuration (TOML + env)
//! - `runtime`: Startup, shutdown and execution modes
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
