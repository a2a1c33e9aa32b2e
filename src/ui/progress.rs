// Single-line progress bar for transfer and cleanup runs

use colored::Colorize;
use std::io::{self, Write};

const BAR_LENGTH: usize = 30;

/// Render `[=====     ] 42%  12.5 MB/sec` on the current line
pub fn show_progress_bar(percent: u8, prefix: &str, speed: Option<&str>) {
    let percent = percent.min(100) as usize;
    let filled = percent * BAR_LENGTH / 100;
    let empty = BAR_LENGTH - filled;

    print!(
        "\r{} [{}{}] {:>3}% {}",
        prefix.white(),
        "=".repeat(filled).green(),
        " ".repeat(empty),
        percent,
        speed.unwrap_or("").dimmed()
    );

    io::stdout().flush().ok();
}

/// Clear the current line
pub fn clear_line() {
    print!("\r{}\r", " ".repeat(80));
    io::stdout().flush().ok();
}
