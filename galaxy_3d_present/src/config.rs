//! Configuration for the graphics device and the image chain

use crate::device::DepthFormat;

/// Debug message severity filter (validation layers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose
    All,
}

/// Where validation messages go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Colored console output (stderr)
    Console,
    /// Append to a log file
    File(String),
    /// Console and file
    Both(String),
}

/// Validation message category filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Validation message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Total number of messages
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    /// True if at least one error was reported
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Graphics device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation layers (requires the `vulkan-validation` feature in the backend)
    pub enable_validation: bool,

    /// Application name reported to the driver
    pub app_name: String,

    /// Severity of validation messages to display
    pub debug_severity: DebugSeverity,

    /// Destination of validation messages
    pub debug_output: DebugOutput,

    /// Categories of validation messages to display
    pub debug_message_filter: DebugMessageFilter,

    /// Abort the process on the first validation error (debugger attach)
    pub break_on_validation_error: bool,

    /// Panic on the first validation error (strict mode for tests)
    pub panic_on_error: bool,

    /// Count validation messages per severity
    pub enable_validation_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Galaxy3D Application".to_string(),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: cfg!(debug_assertions),
        }
    }
}

/// Present mode preference used when negotiating the image chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentModePreference {
    /// Mailbox when available, FIFO otherwise
    #[default]
    LowLatency,
    /// Always FIFO (guaranteed vsync)
    Vsync,
}

/// What to do when a recreated chain has a different color or depth format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatChangePolicy {
    /// Fail with `Error::IncompatibleChainFormat`
    #[default]
    Fatal,
    /// Accept the new chain and bump the orchestrator's format generation
    Notify,
}

/// Image chain configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub present_mode_preference: PresentModePreference,

    /// Depth formats tried in order; the first supported one wins
    pub depth_format_candidates: Vec<DepthFormat>,

    /// Color attachment clear value (RGBA)
    pub clear_color: [f32; 4],

    pub format_change_policy: FormatChangePolicy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            present_mode_preference: PresentModePreference::LowLatency,
            depth_format_candidates: vec![
                DepthFormat::D32Float,
                DepthFormat::D32FloatS8Uint,
                DepthFormat::D24UnormS8Uint,
            ],
            clear_color: [0.01, 0.01, 0.01, 1.0],
            format_change_policy: FormatChangePolicy::Fatal,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
