//! Common Infrastructure Module
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - Common error types

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, Network, TrackerConfig};
pub use error::{Result, SwapError};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_chain_error, log_htlc_event,
    log_swap_state, log_system_event, EventCategory, LogEvent, LogLevel, LoggingError,
};
