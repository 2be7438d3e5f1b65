/// Validation layer messages
///
/// Receives VK_EXT_debug_utils callbacks, filters them by severity and
/// category, counts them per level, marks repeats, and writes them to the
/// console (colored) and/or a file. Strict modes panic or abort on the first
/// validation error.
///
/// Only compiled with the `vulkan-validation` feature.

use ash::vk;
use colored::*;
use galaxy_3d_present::galaxy3d::{DebugSeverity, DebugOutput, DebugMessageFilter, ValidationStats};
use galaxy_3d_present::{engine_info, engine_warn};
use rustc_hash::FxHashMap;
use std::ffi::{c_char, CStr};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "galaxy3d::vulkan::validation";

/// Active configuration; `None` outside the device lifetime
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

static COUNTERS: ValidationCounters = ValidationCounters::new();

static REPEATS: Mutex<Option<RepeatTracker>> = Mutex::new(None);

/// What the callback shows and where
#[derive(Debug, Clone)]
pub struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

/// Severity of a single validation message, in counter order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Verbose = 3,
}

impl MessageLevel {
    fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;

        if severity.contains(S::ERROR) {
            MessageLevel::Error
        } else if severity.contains(S::WARNING) {
            MessageLevel::Warning
        } else if severity.contains(S::INFO) {
            MessageLevel::Info
        } else {
            MessageLevel::Verbose
        }
    }

    fn label(self) -> &'static str {
        match self {
            MessageLevel::Error => "ERROR",
            MessageLevel::Warning => "WARNING",
            MessageLevel::Info => "INFO",
            MessageLevel::Verbose => "VERBOSE",
        }
    }

    fn colored_label(self) -> ColoredString {
        match self {
            MessageLevel::Error => self.label().red().bold(),
            MessageLevel::Warning => self.label().yellow().bold(),
            MessageLevel::Info => self.label().cyan(),
            MessageLevel::Verbose => self.label().bright_black(),
        }
    }
}

/// Lock-free per-level message counts
struct ValidationCounters {
    counts: [AtomicU32; 4],
}

impl ValidationCounters {
    const fn new() -> Self {
        Self {
            counts: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    fn record(&self, level: MessageLevel) {
        self.counts[level as usize].fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        let count = |level: MessageLevel| self.counts[level as usize].load(Ordering::Relaxed);
        ValidationStats {
            errors: count(MessageLevel::Error),
            warnings: count(MessageLevel::Warning),
            info: count(MessageLevel::Info),
            verbose: count(MessageLevel::Verbose),
        }
    }

    fn clear(&self) {
        for counter in &self.counts {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Occurrences of each distinct message text
#[derive(Default)]
struct RepeatTracker {
    occurrences: FxHashMap<String, u32>,
}

impl RepeatTracker {
    /// Count one more occurrence, returns the total so far
    fn record(&mut self, message: &str) -> u32 {
        let count = self.occurrences.entry(message.to_owned()).or_insert(0);
        *count += 1;
        *count
    }

    /// Number of distinct messages seen more than once
    fn repeated(&self) -> usize {
        self.occurrences.values().filter(|&&count| count > 1).count()
    }
}

fn type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Severity flags the messenger subscribes to
pub fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;

    match severity {
        DebugSeverity::ErrorsOnly => S::ERROR,
        DebugSeverity::ErrorsAndWarnings => S::ERROR | S::WARNING,
        DebugSeverity::All => S::ERROR | S::WARNING | S::INFO | S::VERBOSE,
    }
}

fn should_display(
    config: &Config,
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
) -> bool {
    if !severity_flags(config.severity).intersects(message_severity) {
        return false;
    }

    let filter = &config.message_filter;
    match type_label(message_type) {
        "Validation" => filter.show_validation,
        "Performance" => filter.show_performance,
        _ => filter.show_general,
    }
}

/// Install the configuration and start from zeroed statistics
pub fn init_debug_config(config: Config) {
    COUNTERS.clear();

    if let Ok(mut repeats) = REPEATS.lock() {
        *repeats = Some(RepeatTracker::default());
    }
    if let Ok(mut guard) = DEBUG_CONFIG.lock() {
        *guard = Some(config);
    }
}

/// Drop the configuration so late callbacks (during device destruction) are ignored
pub fn cleanup_debug_config() {
    if let Ok(mut guard) = DEBUG_CONFIG.lock() {
        *guard = None;
    }
}

/// Counts of validation messages received since the device was created
pub fn get_validation_stats() -> ValidationStats {
    COUNTERS.snapshot()
}

/// Log a summary of the validation messages through the galaxy3d logger
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        engine_info!(SOURCE, "No validation messages");
        return;
    }

    let repeated = REPEATS
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(RepeatTracker::repeated))
        .unwrap_or(0);

    let summary = format!(
        "{} message(s): {} error(s), {} warning(s), {} info, {} verbose ({} repeated)",
        stats.total(), stats.errors, stats.warnings, stats.info, stats.verbose, repeated
    );

    if stats.has_errors() || stats.warnings > 0 {
        engine_warn!(SOURCE, "{}", summary);
    } else {
        engine_info!(SOURCE, "{}", summary);
    }
}

/// Read a C string from the callback data, with a fallback for null pointers
///
/// # Safety
///
/// `ptr` is null or points to a NUL-terminated string valid for `'a`.
unsafe fn callback_str<'a>(ptr: *const c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        return fallback;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("<invalid UTF-8>")
}

/// Debug messenger callback installed on the instance
///
/// Always returns `VK_FALSE`: the triggering Vulkan call is never aborted.
///
/// # Safety
///
/// Called by the Vulkan loader; `p_callback_data` is null or valid for the call.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let config = match DEBUG_CONFIG.lock().ok().and_then(|guard| guard.clone()) {
        Some(config) => config,
        None => return vk::FALSE,
    };

    if !should_display(&config, message_severity, message_type) {
        return vk::FALSE;
    }

    let callback_data = unsafe { *p_callback_data };
    let message_id = unsafe { callback_str(callback_data.p_message_id_name, "-") };
    let message = unsafe { callback_str(callback_data.p_message, "") };

    let level = MessageLevel::from_vk(message_severity);
    let category = type_label(message_type);

    let occurrences = if config.enable_stats {
        COUNTERS.record(level);
        REPEATS
            .lock()
            .map(|mut guard| guard.get_or_insert_with(RepeatTracker::default).record(message))
            .unwrap_or(1)
    } else {
        1
    };

    match &config.output {
        DebugOutput::Console => eprint!("{}", format_colored(level, category, occurrences, message_id, message)),
        DebugOutput::File(path) => write_to_file(path, &format_plain(level, category, occurrences, message_id, message)),
        DebugOutput::Both(path) => {
            eprint!("{}", format_colored(level, category, occurrences, message_id, message));
            write_to_file(path, &format_plain(level, category, occurrences, message_id, message));
        }
    }

    if level == MessageLevel::Error {
        if config.panic_on_error {
            panic!("Vulkan validation error ({} / {}): {}", category, message_id, message);
        }
        if config.break_on_error {
            eprintln!(
                "{} {} / {}",
                "Validation error, aborting:".red().bold(),
                category.cyan(),
                message_id.yellow()
            );
            std::process::abort();
        }
    }

    vk::FALSE
}

fn repeat_suffix(occurrences: u32) -> String {
    if occurrences > 1 {
        format!(" (x{})", occurrences)
    } else {
        String::new()
    }
}

fn format_colored(level: MessageLevel, category: &str, occurrences: u32, message_id: &str, message: &str) -> String {
    format!(
        "{} {} {} {}{}\n    {}\n",
        "[vk]".bright_blue().bold(),
        level.colored_label(),
        category.bright_black(),
        message_id.white(),
        repeat_suffix(occurrences).yellow(),
        message
    )
}

fn format_plain(level: MessageLevel, category: &str, occurrences: u32, message_id: &str, message: &str) -> String {
    format!(
        "[vk] {} {} {}{}\n    {}",
        level.label(), category, message_id, repeat_suffix(occurrences), message
    )
}

/// Append one entry to the log file; I/O errors are ignored
fn write_to_file(path: &str, entry: &str) {
    let file = OpenOptions::new().create(true).append(true).open(path);
    if let Ok(mut file) = file {
        let _ = writeln!(file, "{}", entry);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
