use super::{load_config, required, shot_context};
use crate::core::audit::read_entries;
use crate::core::layout::ProductionLayout;
use anyhow::Result;
use colored::*;
use serde_json::Value;

fn field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or("N/A")
}

fn print_publish_entry(entry: &Value) {
    println!(
        "{}  {} @ {}  [{}]",
        field(entry, "DateTime").white().bold(),
        field(entry, "User").cyan(),
        field(entry, "Host"),
        field(entry, "Mode")
    );
    println!("  Comment: {}", field(entry, "Comment"));
    if let Some(publishes) = entry.get("Publishes").and_then(Value::as_array) {
        for publish in publishes {
            println!(
                "  {} -> {}",
                field(publish, "source").dimmed(),
                field(publish, "destination").green()
            );
        }
    }
}

fn print_archive_entry(entry: &Value) {
    println!(
        "{}  {} @ {}  Shot: {}",
        field(entry, "DateTime").white().bold(),
        field(entry, "User").cyan(),
        field(entry, "Host"),
        field(entry, "Shot")
    );

    let filters = entry.get("Filters");
    let threshold = filters
        .and_then(|f| f.get("Threshold"))
        .map(|t| t.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    println!("  Threshold: {}", threshold);

    let max_age = filters.and_then(|f| f.get("MaxAge"));
    let enabled = max_age
        .and_then(|m| m.get("enabled"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if enabled {
        let days = max_age
            .and_then(|m| m.get("days"))
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!("  Max Age: {} days", days);
    } else {
        println!("  Max Age: disabled");
    }

    println!("  Comment: {}", field(entry, "Comment"));
    match entry.get("CleanedVersions").and_then(Value::as_array) {
        Some(cleaned) if !cleaned.is_empty() => {
            println!("  Cleaned versions:");
            for version in cleaned {
                println!("    - {}", version.as_str().unwrap_or("?").red());
            }
        }
        _ => println!("  Cleaned versions: none"),
    }
}

/// `log publish SHOW SEQUENCE SHOT` / `log archive SHOW SEQUENCE`:
/// print audit history, oldest first
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let layout = ProductionLayout::new(&config);

    let (path, archive) = match matches.subcommand() {
        Some(("publish", sub)) => (layout.publish_log_path(&shot_context(sub)?), false),
        Some(("archive", sub)) => (
            layout.archive_log_path(required(sub, "show")?, required(sub, "sequence")?),
            true,
        ),
        _ => anyhow::bail!("expected 'publish' or 'archive'"),
    };

    let entries = read_entries(&path);
    if entries.is_empty() {
        println!(
            "{}",
            format!("No entries in {}", path.display()).yellow()
        );
        return Ok(());
    }

    println!("{}", path.display().to_string().dimmed());
    println!();
    for entry in &entries {
        if archive {
            print_archive_entry(entry);
        } else {
            print_publish_entry(entry);
        }
        println!();
    }
    println!(
        "{}",
        format!("{} entries", entries.len()).dimmed()
    );

    Ok(())
}
