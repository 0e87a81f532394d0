//! Structured Logging for swapwatch
//!
//! Provides structured logging with:
//! - JSON output for log aggregation services
//! - Correlation IDs per watch session
//! - Swap state and chain event records
//!
//! # Usage
//!
//! ```rust,ignore
//! use swapwatch::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true)?; // JSON mode
//! tracing::info!(target: "swapwatch::swap", order_id = %id, "Order initiated");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::events::HtlcEvent;
use crate::state::SwapState;

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Swap state classification
    Swap,
    /// HTLC contract events (watch / backfill)
    Event,
    /// UTXO indexer requests
    Indexer,
    /// Account chain requests
    Chain,
    /// System events (startup, shutdown)
    System,
    /// Error events
    Error,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (ISO 8601)
    pub timestamp: String,
    /// Log level
    pub level: String,
    /// Event category
    pub category: EventCategory,
    /// Human-readable message
    pub message: String,
    /// Correlation ID (watch session)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: format!("{:?}", level).to_uppercase(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    /// Add correlation ID
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add error details
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Domain Event Logging
// ============================================================================

/// Log a classified swap state
pub fn log_swap_state(swap_id: &str, state: &SwapState) {
    let event = LogEvent::new(LogLevel::Info, EventCategory::Swap, format!("swap {}", state))
        .with_correlation_id(swap_id)
        .with_data(serde_json::json!({
            "swap_id": swap_id,
            "state": state,
            "terminal": state.is_terminal(),
        }));

    tracing::info!(target: "swapwatch::swap", "{}", event.to_json());
}

/// Log one normalized HTLC event
pub fn log_htlc_event(event: &HtlcEvent, correlation_id: Option<&str>) {
    let mut record = LogEvent::new(
        LogLevel::Info,
        EventCategory::Event,
        format!("{} at block {}", event.kind(), event.block_number()),
    )
    .with_data(serde_json::json!({
        "order_id": format!("{:#x}", event.order_id()),
        "tx_hash": format!("{:#x}", event.meta().tx_hash),
        "kind": event.kind(),
        "block_number": event.block_number(),
    }));

    if let Some(id) = correlation_id {
        record = record.with_correlation_id(id);
    }

    tracing::info!(target: "swapwatch::event", "{}", record.to_json());
}

/// Log a failed chain or indexer call
pub fn log_chain_error(category: EventCategory, operation: &str, code: &str, message: &str) {
    let event = LogEvent::new(LogLevel::Error, category, operation)
        .with_error(code, message)
        .with_data(serde_json::json!({ "operation": operation }));

    tracing::error!(target: "swapwatch::chain", "{}", event.to_json());
}

/// Log a system lifecycle event (watch start / stop)
pub fn log_system_event(message: &str, correlation_id: &str, data: serde_json::Value) {
    let event = LogEvent::new(LogLevel::Info, EventCategory::System, message)
        .with_correlation_id(correlation_id)
        .with_data(data);

    tracing::info!(target: "swapwatch::system", "{}", event.to_json());
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Minimum log level to output
/// * `json_format` - Use JSON format
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = format!("{:?}", level).to_lowercase();
        EnvFilter::new(format!("swapwatch={},reqwest={}", level, level))
    });

    if json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        );

        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        );

        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from TrackerConfig
pub fn init_from_config(config: &super::config::TrackerConfig) -> Result<(), LoggingError> {
    init_logging(LogLevel::from(config.log_level.as_str()), config.log_json)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Generate a unique correlation ID for a watch session
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(LogLevel::Warn, EventCategory::Indexer, "Test event")
            .with_correlation_id("test-123")
            .with_data(serde_json::json!({"key": "value"}))
            .with_error("INDEXER_ERROR", "timeout");

        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["message"], "Test event");
        assert_eq!(json["level"], "WARN");
        assert_eq!(json["category"], "indexer");
        assert_eq!(json["correlation_id"], "test-123");
        assert_eq!(json["error"]["code"], "INDEXER_ERROR");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = LogEvent::new(LogLevel::Info, EventCategory::System, "start").to_json();
        assert!(!json.contains("correlation_id"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from("unknown"), LogLevel::Info);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let id1 = generate_correlation_id();
        let id2 = generate_correlation_id();

        assert_eq!(id1.len(), 36);
        assert_ne!(id1, id2);
    }
}
