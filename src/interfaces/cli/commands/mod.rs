//! CLI command implementations

mod config_gen;
mod user;

pub use config_gen::config_generate;
pub use user::{promote_user, reset_user_password};
