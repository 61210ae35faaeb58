//! Logging utilities for output and progress tracking
//!
//! This module provides consistent log lines for file operations and
//! progress bars for long-running fits.

pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use log::{log_operation_complete, log_operation_start, log_stage, log_warning};
pub use progress::{create_main_progress_bar, finish_progress_bar, hidden_progress_bar};
