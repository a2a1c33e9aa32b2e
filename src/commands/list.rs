use super::load_config;
use crate::core::layout::ProductionLayout;
use anyhow::Result;
use colored::*;

/// `list [SHOW] [SEQUENCE]`: shows, sequences of a show, or shots of a sequence
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let layout = ProductionLayout::new(&config);

    let show = matches.get_one::<String>("show");
    let sequence = matches.get_one::<String>("sequence");

    let (title, entries) = match (show, sequence) {
        (None, _) => (
            format!("Shows in {}", config.project_root.display()),
            layout.list_shows(),
        ),
        (Some(show), None) => (format!("Sequences of {}", show), layout.list_sequences(show)),
        (Some(show), Some(sequence)) => (
            format!("Shots of {}/{}", show, sequence),
            layout.list_shots(show, sequence),
        ),
    };

    println!("{}", title.white().bold());
    if entries.is_empty() {
        println!("{}", "  (none found)".dimmed());
        return Ok(());
    }
    for entry in &entries {
        println!("  {}", entry.cyan());
    }
    println!();
    println!("{}", format!("{} entries", entries.len()).dimmed());

    Ok(())
}
