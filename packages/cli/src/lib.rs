// ABOUTME: Library half of the ecflow binary
// ABOUTME: Configuration and server bootstrap shared by the command-line entry point

pub mod config;
pub mod server;

pub use config::{Config, ConfigError};
pub use server::{build_app, init_tracing, run_server, ServerError};
