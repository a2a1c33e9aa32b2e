use super::{install_abort_handler, load_config, shot_context, throttle_from};
use crate::core::audit::Stamp;
use crate::core::publish::{list_working_versions, plan_publish, record_publish, resolve_selector};
use crate::core::transfer::{MirrorCommand, TransferMode, TransferOrchestrator};
use crate::platform::process::SystemLauncher;
use crate::ui::controls::{controls_hint, ControlKey, EventMonitor};
use crate::ui::{confirm, require_comment};
use anyhow::{bail, Context, Result};
use colored::*;
use std::sync::Arc;

/// `publish SHOW SEQUENCE SHOT VERSION...`: mirror working versions into
/// the publish location, then record the publish in the shot's log
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let ctx = shot_context(matches)?;
    let dry_run = matches.get_flag("dry-run");

    // Fails early when the department has no publish location.
    config.publish_template()?;

    let mode = if matches.get_flag("move") {
        TransferMode::Move
    } else {
        TransferMode::Copy
    };
    let throttle = throttle_from(matches, &config);

    let listings = list_working_versions(&config, &ctx)?;
    let selected = matches
        .get_many::<String>("versions")
        .map(|vals| {
            vals.map(|s| resolve_selector(&listings, s))
                .collect::<crate::Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    let plan = plan_publish(&config, &ctx, &selected, mode, throttle)?;
    let orchestrator = TransferOrchestrator::new(
        plan.batch.clone(),
        MirrorCommand::new(config.mirror_program.clone()),
        Arc::new(SystemLauncher),
    );

    println!(
        "{}",
        format!(
            "{} {} version(s) of {} ({} mode)",
            if mode == TransferMode::Move { "Moving" } else { "Publishing" },
            plan.batch.len(),
            ctx.shot,
            throttle.name()
        )
        .cyan()
        .bold()
    );
    for record in &plan.records {
        println!("  {} {}", record.source.dimmed(), "->".dimmed());
        println!("    {}", record.destination.green());
    }
    println!();

    if dry_run {
        for line in orchestrator.preview() {
            println!("  {}", line);
        }
        println!();
        println!(
            "{}",
            "DRY RUN MODE - Nothing was copied".yellow().bold()
        );
        return Ok(());
    }

    let comment = require_comment(
        matches.get_one::<String>("comment").map(String::as_str),
        "publish",
    )?;
    if !matches.get_flag("yes") && !confirm("Start the transfer?", true)? {
        println!("{}", "Publish cancelled.".yellow());
        return Ok(());
    }

    let abort_flag = install_abort_handler()?;
    let handle = orchestrator.spawn();
    let control = handle.control();

    let mut monitor = EventMonitor::new("Transferring").with_abort_flag(&abort_flag);
    if monitor.is_interactive() {
        println!("{}", controls_hint(true).dimmed());
    }
    monitor.run(&handle.events, |key| match key {
        ControlKey::TogglePause => control.set_paused(!control.is_paused()),
        ControlKey::Abort => control.abort(),
    });

    let outcome = handle.join();
    if !outcome.success {
        println!("{}", "TRANSFER FAILED OR ABORTED".red().bold());
        bail!(
            "publish of {} stopped after {} of {} job(s)",
            ctx.shot,
            outcome.completed,
            plan.batch.len()
        );
    }

    println!("{}", "TRANSFER COMPLETED SUCCESSFULLY".green().bold());
    if let Some(speed) = &outcome.last_speed {
        println!("{}", format!("Last reported speed: {}", speed).dimmed());
    }

    let recorded = record_publish(&config, &ctx, &plan, &outcome, Stamp::current(), &comment)
        .context("Failed to write publish log")?;
    if let Some(log_path) = recorded {
        println!(
            "{}",
            format!("Publish recorded in {}", log_path.display()).dimmed()
        );
    }

    Ok(())
}
