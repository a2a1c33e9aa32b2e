// Command handlers module
pub mod archive;
pub mod history;
pub mod list;
pub mod publish;
pub mod report;
pub mod versions;

use crate::core::config::Config;
use crate::core::layout::ShotContext;
use crate::core::transfer::Throttle;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Load the config named by the global `--config` flag (or the default)
pub(crate) fn load_config(matches: &clap::ArgMatches) -> Result<Config> {
    let explicit = matches.get_one::<String>("config").map(Path::new);
    Config::load(explicit).context("Failed to load configuration")
}

pub(crate) fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{}>", name))
}

pub(crate) fn shot_context(matches: &clap::ArgMatches) -> Result<ShotContext> {
    Ok(ShotContext::new(
        required(matches, "show")?,
        required(matches, "sequence")?,
        required(matches, "shot")?,
    ))
}

/// `--throttle fast|slow`; slow uses the configured inter-packet gap
pub(crate) fn throttle_from(matches: &clap::ArgMatches, config: &Config) -> Throttle {
    match matches.get_one::<String>("throttle").map(String::as_str) {
        Some("slow") => Throttle::Slow {
            inter_packet_gap_ms: config.throttle_delay_ms,
        },
        _ => Throttle::Fast,
    }
}

/// Install the Ctrl+C handler; the returned flag is raised on interrupt
pub(crate) fn install_abort_handler() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();

    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Abort requested...".yellow().bold());
        flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    Ok(flag)
}
