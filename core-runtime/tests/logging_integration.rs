//! Integration tests for logging initialisation
//!
//! The global subscriber can only be installed once per process, so this file
//! holds a single test that exercises both the first and the repeated call.

use bridge_traits::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::Arc;

#[test]
fn test_init_logging_once_per_process() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));

    init_logging(config).unwrap();
    tracing::info!(target: "core_auth", "logging ready");

    let again = init_logging(LoggingConfig::default().with_format(LogFormat::Json));
    match again {
        Err(Error::Config(message)) => assert!(message.contains("Failed to initialize logging")),
        other => panic!("expected config error, got {:?}", other),
    }
}
