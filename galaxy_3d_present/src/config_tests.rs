//! Unit tests for config.rs

use crate::config::*;
use crate::device::DepthFormat;

// ============================================================================
// DEVICE CONFIG TESTS
// ============================================================================

#[test]
fn test_config_default_validation_follows_build() {
    let config = Config::default();
    assert_eq!(config.enable_validation, cfg!(debug_assertions));
    assert_eq!(config.debug_severity, DebugSeverity::ErrorsAndWarnings);
    assert_eq!(config.debug_output, DebugOutput::Console);
    assert!(!config.break_on_validation_error);
    assert!(!config.panic_on_error);
}

#[test]
fn test_debug_message_filter_default_shows_everything() {
    let filter = DebugMessageFilter::default();
    assert!(filter.show_general);
    assert!(filter.show_validation);
    assert!(filter.show_performance);
}

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
    assert!(stats.has_errors());
    assert!(!ValidationStats::default().has_errors());
    assert_eq!(ValidationStats::default().total(), 0);
}

// ============================================================================
// CHAIN CONFIG TESTS
// ============================================================================

#[test]
fn test_chain_config_defaults() {
    let config = ChainConfig::default();
    assert_eq!(config.present_mode_preference, PresentModePreference::LowLatency);
    assert_eq!(
        config.depth_format_candidates,
        vec![DepthFormat::D32Float, DepthFormat::D32FloatS8Uint, DepthFormat::D24UnormS8Uint]
    );
    assert_eq!(config.clear_color, [0.01, 0.01, 0.01, 1.0]);
    assert_eq!(config.format_change_policy, FormatChangePolicy::Fatal);
}

#[test]
fn test_chain_config_struct_update() {
    let config = ChainConfig {
        present_mode_preference: PresentModePreference::Vsync,
        ..Default::default()
    };
    assert_eq!(config.present_mode_preference, PresentModePreference::Vsync);
    assert_eq!(config.depth_format_candidates.len(), 3);
}
