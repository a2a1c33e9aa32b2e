use super::{install_abort_handler, load_config, required, throttle_from};
use crate::core::audit::{append_entry, ArchiveFilters, ArchiveLogEntry, MaxAgeFilter, Stamp};
use crate::core::deletion::{VersionCleaner, NOTHING_TO_DO_MESSAGE};
use crate::core::layout::{ProductionLayout, ShotContext};
use crate::core::retention::{RetentionAnalyzer, RetentionPolicy, ScanMode};
use crate::platform::identity;
use crate::ui::controls::{controls_hint, ControlKey, EventMonitor};
use crate::ui::{confirm, format_size, require_comment};
use anyhow::{bail, Context, Result};
use colored::*;
use std::path::PathBuf;

/// `archive SHOW SEQUENCE [SHOT...]`: delete superseded or aged versions
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let show = required(matches, "show")?;
    let sequence = required(matches, "sequence")?;
    let dry_run = matches.get_flag("dry-run");

    let user = identity::login_name();
    if !config.is_archive_allowed(&user) {
        bail!(crate::RenderPubError::permission_denied(format!(
            "user '{}' is not allowed to archive (see 'admin_users' in config)",
            user
        )));
    }

    let (mode, template) = if matches.get_flag("published") {
        (ScanMode::Published, config.publish_template()?)
    } else {
        (ScanMode::WorkingArea, config.source_template()?)
    };

    let keep = *matches.get_one::<usize>("keep").unwrap_or(&5);
    let mut policy = RetentionPolicy::keep_latest(keep);
    if let Some(&days) = matches.get_one::<f64>("max-age") {
        policy = policy.with_max_age(days);
    }
    policy.validate()?;
    let throttle = throttle_from(matches, &config);

    let layout = ProductionLayout::new(&config);
    let shots: Vec<String> = match matches.get_many::<String>("shots") {
        Some(vals) => vals.cloned().collect(),
        None => layout.list_shots(show, sequence),
    };
    if shots.is_empty() {
        println!(
            "{}",
            format!("No shots found in {}/{}", show, sequence).yellow()
        );
        return Ok(());
    }

    let shot_roots: Vec<PathBuf> = shots
        .iter()
        .map(|shot| layout.shot_root(&ShotContext::new(show, sequence, shot.as_str())))
        .collect();

    println!(
        "{}",
        format!(
            "Analyzing {} shot(s): keep latest {}, max age {}",
            shots.len(),
            keep,
            if policy.max_age_enabled {
                format!("{} days", policy.max_age_days)
            } else {
                "disabled".to_string()
            }
        )
        .cyan()
    );

    let plan = RetentionAnalyzer::new(&template, mode, policy).analyze(&shot_roots);
    if plan.is_empty() {
        println!("{}", NOTHING_TO_DO_MESSAGE.green());
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("{} version(s) selected for deletion:", plan.len())
            .white()
            .bold()
    );
    for label in plan.labels() {
        println!("  {}", label.red());
    }
    println!();

    if dry_run {
        println!(
            "{}",
            "DRY RUN MODE - No files were deleted".yellow().bold()
        );
        return Ok(());
    }

    let comment = require_comment(
        matches.get_one::<String>("comment").map(String::as_str),
        "archive",
    )?;
    if !matches.get_flag("yes") && !confirm("Delete the contents of these versions?", false)? {
        println!("{}", "Archive cancelled.".yellow());
        return Ok(());
    }

    let abort_flag = install_abort_handler()?;
    let handle = VersionCleaner::new().spawn(plan);

    let mut monitor = EventMonitor::new("Archiving").with_abort_flag(&abort_flag);
    if monitor.is_interactive() {
        println!("{}", controls_hint(false).dimmed());
    }
    monitor.run(&handle.events, |key| {
        if key == ControlKey::Abort {
            handle.abort();
        }
    });

    let stats = handle.join();

    // Record exactly the versions whose deletion was attempted, even after an abort.
    if !stats.attempted.is_empty() {
        let filters = ArchiveFilters {
            threshold: policy.count_threshold,
            max_age: MaxAgeFilter {
                enabled: policy.max_age_enabled,
                days: policy.max_age_enabled.then_some(policy.max_age_days),
            },
            throttle: throttle.name().to_string(),
        };
        let entry = ArchiveLogEntry::new(
            Stamp::current(),
            &shots.join(", "),
            filters,
            &comment,
            stats.attempted_labels(),
        );
        let log_path = layout.archive_log_path(show, sequence);
        append_entry(&log_path, &entry)
            .with_context(|| format!("Failed to write archive log {}", log_path.display()))?;
        println!(
            "{}",
            format!("Archive recorded in {}", log_path.display()).dimmed()
        );
    }

    if !stats.success() {
        println!("{}", "ARCHIVE FAILED OR ABORTED".red().bold());
        bail!(
            "archive aborted after {} of {} version(s)",
            stats.attempted.len(),
            stats.total_candidates
        );
    }

    println!("{}", "ARCHIVE COMPLETED SUCCESSFULLY".green().bold());
    println!(
        "{}",
        format!(
            "{} files removed ({}), {} could not be removed",
            stats.deleted_files,
            format_size(stats.deleted_size),
            stats.failed_files
        )
        .dimmed()
    );

    Ok(())
}
