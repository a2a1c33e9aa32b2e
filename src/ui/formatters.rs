use chrono::{DateTime, Local};
use std::time::SystemTime;

/// Format a byte count in human-readable form (B, KB, MB, GB, TB)
pub fn format_size(size: u64) -> String {
    const KB: f64 = 1024.0;
    let size_f = size as f64;
    if size < 1024 {
        format!("{}B", size)
    } else if size_f < KB * KB {
        format!("{:.1}KB", size_f / KB)
    } else if size_f < KB * KB * KB {
        format!("{:.1}MB", size_f / (KB * KB))
    } else if size_f < KB * KB * KB * KB {
        format!("{:.1}GB", size_f / (KB * KB * KB))
    } else {
        format!("{:.2}TB", size_f / (KB * KB * KB * KB))
    }
}

/// Format timestamp as `YYYY-MM-DD HH:MM`
pub fn format_time(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M").to_string()
}

/// Format an age in fractional days, e.g. `3.2d`
pub fn format_age_days(days: f64) -> String {
    if days < 1.0 {
        format!("{:.0}h", days * 24.0)
    } else {
        format!("{:.1}d", days)
    }
}
