//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the global logger API.

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

fn entry(severity: LogSeverity, source: &str, message: &str) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: source.to_string(),
        message: message.to_string(),
        file: None,
        line: None,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Warn), "Warn");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "galaxy3d::vulkan".to_string(),
        message: "vkQueuePresentKHR failed".to_string(),
        file: Some("vulkan_graphics_device.rs"),
        line: Some(42),
    };

    assert_eq!(entry.severity, LogSeverity::Error);
    assert_eq!(entry.source, "galaxy3d::vulkan");
    assert_eq!(entry.file, Some("vulkan_graphics_device.rs"));
    assert_eq!(entry.line, Some(42));
}

#[test]
fn test_log_entry_clone_keeps_fields() {
    let entry1 = entry(LogSeverity::Warn, "galaxy3d::ImageChain", "suboptimal");
    let entry2 = entry1.clone();

    assert_eq!(entry1.severity, entry2.severity);
    assert_eq!(entry1.source, entry2.source);
    assert_eq!(entry1.message, entry2.message);
    assert_eq!(entry1.timestamp, entry2.timestamp);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;

    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify it doesn't panic
        logger.log(&entry(severity, "test", "message"));
    }
}

#[test]
fn test_default_logger_error_with_file_line() {
    let logger = DefaultLogger;
    let mut entry = entry(LogSeverity::Error, "galaxy3d::vulkan", "Device lost");
    entry.file = Some("vulkan_graphics_device.rs");
    entry.line = Some(123);

    logger.log(&entry);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

/// Records entries whose source matches, so concurrent tests logging
/// from other modules do not interfere
struct CaptureLogger {
    source: &'static str,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source == self.source {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

fn install_capture(source: &'static str) -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { source, entries: entries.clone() });
    entries
}

#[test]
#[serial]
fn test_set_logger_receives_macro_output() {
    let entries = install_capture("galaxy3d::log_tests::macros");

    crate::engine_info!("galaxy3d::log_tests::macros", "Created {} images", 3);
    crate::engine_warn!("galaxy3d::log_tests::macros", "Surface suboptimal");

    let captured = entries.lock().unwrap().clone();
    log::reset_logger();

    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].message, "Created 3 images");
    assert!(captured[0].file.is_none());
    assert_eq!(captured[1].severity, LogSeverity::Warn);
}

#[test]
#[serial]
fn test_engine_error_carries_file_line() {
    let entries = install_capture("galaxy3d::log_tests::error");

    crate::engine_error!("galaxy3d::log_tests::error", "Fence wait failed");

    let captured = entries.lock().unwrap().clone();
    log::reset_logger();

    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert!(captured[0].file.unwrap().ends_with("log_tests.rs"));
    assert!(captured[0].line.is_some());
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_backend_error() {
    let entries = install_capture("galaxy3d::log_tests::err");

    let err = crate::engine_err!("galaxy3d::log_tests::err", "Submit failed: {}", -4);

    let captured = entries.lock().unwrap().clone();
    log::reset_logger();

    assert_eq!(err, crate::error::Error::BackendError("Submit failed: -4".to_string()));
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "Submit failed: -4");
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    let entries = install_capture("galaxy3d::log_tests::bail");

    fn bailing(fail: bool) -> crate::error::Result<u32> {
        if fail {
            crate::engine_bail!("galaxy3d::log_tests::bail", "bailing out");
        }
        Ok(7)
    }

    let ok = bailing(false);
    let failed = bailing(true);
    let captured = entries.lock().unwrap().clone();
    log::reset_logger();

    assert_eq!(ok, Ok(7));
    assert!(matches!(failed, Err(crate::error::Error::BackendError(_))));
    assert_eq!(captured.len(), 1);
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let entries = install_capture("galaxy3d::log_tests::filter");
    let previous = log::min_severity();

    log::set_min_severity(LogSeverity::Warn);
    crate::engine_debug!("galaxy3d::log_tests::filter", "dropped");
    crate::engine_info!("galaxy3d::log_tests::filter", "dropped");
    crate::engine_warn!("galaxy3d::log_tests::filter", "kept");
    log::set_min_severity(previous);

    let captured = entries.lock().unwrap().clone();
    log::reset_logger();

    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "kept");
}

#[test]
#[serial]
fn test_trace_disabled_by_default() {
    let entries = install_capture("galaxy3d::log_tests::trace");

    assert!(!log::enabled(LogSeverity::Trace));
    crate::engine_trace!("galaxy3d::log_tests::trace", "per-frame noise");

    let captured = entries.lock().unwrap().clone();
    log::reset_logger();

    assert!(captured.is_empty());
}
