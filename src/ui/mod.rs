// UI and formatting module

pub mod controls;
pub mod formatters;
pub mod progress;
pub mod prompts;

// Re-export commonly used items for cleaner imports
pub use controls::{ControlKey, EventMonitor};
pub use formatters::{format_age_days, format_size, format_time};
pub use progress::{clear_line, show_progress_bar};
pub use prompts::{confirm, dimmed, error, info, require_comment, success, warn};
