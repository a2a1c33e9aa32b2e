use super::{load_config, shot_context};
use crate::core::publish::{list_working_versions, PublishStatus};
use crate::core::metrics::age_between;
use crate::ui::{format_age_days, format_size, format_time};
use anyhow::Result;
use colored::*;
use std::time::SystemTime;

fn status_label(status: PublishStatus) -> ColoredString {
    let text = format!("{:<12}", status.as_str());
    match status {
        PublishStatus::Empty => text.dimmed(),
        PublishStatus::Unpublished => text.blue(),
        PublishStatus::Stale => text.red().bold(),
        PublishStatus::Published => text.green(),
    }
}

/// `versions SHOW SEQUENCE SHOT`: working versions with their publish status
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let ctx = shot_context(matches)?;

    let listings = list_working_versions(&config, &ctx)?;
    if listings.is_empty() {
        println!(
            "{}",
            format!("No working versions found for {}", ctx.shot).yellow()
        );
        return Ok(());
    }

    let now = SystemTime::now();
    for listing in &listings {
        println!("{}", listing.render_name.white().bold());
        for entry in &listing.versions {
            println!(
                "  {:<10} {} {:>10}  {} {:>7}  {}",
                entry.version.version_label.cyan(),
                status_label(entry.status),
                format_size(entry.size),
                format_time(entry.version.modified_at).dimmed(),
                format_age_days(age_between(entry.version.modified_at, now)),
                entry.version.owner
            );
        }
    }

    Ok(())
}
