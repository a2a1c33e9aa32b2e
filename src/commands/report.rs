use super::{load_config, required};
use crate::core::publish::{shot_sizes, SizeArea};
use crate::ui::format_size;
use anyhow::Result;
use colored::*;

/// `report SHOW SEQUENCE [--final]`: storage used per shot
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let show = required(matches, "show")?;
    let sequence = required(matches, "sequence")?;

    let area = if matches.get_flag("final") {
        SizeArea::Final
    } else {
        SizeArea::Wip
    };

    let sizes = shot_sizes(&config, show, sequence, area)?;
    let area_name = match area {
        SizeArea::Wip => "WIP",
        SizeArea::Final => "FINAL",
    };

    println!(
        "{}",
        format!("{} size of {}/{}", area_name, show, sequence)
            .white()
            .bold()
    );
    if sizes.is_empty() {
        println!("{}", "  (no shots)".dimmed());
        return Ok(());
    }

    let width = sizes.iter().map(|s| s.shot.len()).max().unwrap_or(0);
    let mut total = 0u64;
    for entry in &sizes {
        total += entry.size;
        let size = format_size(entry.size);
        let size = if entry.size == 0 {
            size.dimmed()
        } else {
            size.cyan()
        };
        println!("  {:<width$}  {:>10}", entry.shot, size, width = width);
    }
    println!();
    println!(
        "{}",
        format!("Total: {} across {} shot(s)", format_size(total), sizes.len()).bold()
    );

    Ok(())
}
