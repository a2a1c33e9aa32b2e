use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use colored::*;

use renderpub::commands;

fn show_arg() -> Arg {
    Arg::new("show").help("Show name").required(true).index(1)
}

fn sequence_arg() -> Arg {
    Arg::new("sequence")
        .help("Sequence name")
        .required(true)
        .index(2)
}

fn shot_arg() -> Arg {
    Arg::new("shot").help("Shot name").required(true).index(3)
}

fn comment_arg() -> Arg {
    Arg::new("comment")
        .short('m')
        .long("comment")
        .value_name("TEXT")
        .help("Comment recorded in the audit log (prompted for when omitted)")
}

fn yes_arg() -> Arg {
    Arg::new("yes")
        .short('y')
        .long("yes")
        .help("Do not ask for confirmation")
        .action(ArgAction::SetTrue)
}

fn throttle_arg() -> Arg {
    Arg::new("throttle")
        .short('t')
        .long("throttle")
        .value_name("MODE")
        .help("Transfer speed: fast (multi-threaded) or slow (inter-packet gap)")
        .value_parser(["fast", "slow"])
        .default_value("fast")
}

fn dry_run_arg(help: &'static str) -> Arg {
    Arg::new("dry-run")
        .long("dry-run")
        .help(help)
        .action(ArgAction::SetTrue)
}

fn build_cli() -> Command {
    Command::new("renderpub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Publish and archive render versions in a production tree")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Config file (defaults to $RENDERPUB_CONFIG, then the user config dir)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("list")
                .about("List shows, sequences of a show, or shots of a sequence")
                .arg(Arg::new("show").help("Show name").index(1))
                .arg(
                    Arg::new("sequence")
                        .help("Sequence name")
                        .index(2)
                        .requires("show"),
                ),
        )
        .subcommand(
            Command::new("versions")
                .about("List working versions of a shot with their publish status")
                .arg(show_arg())
                .arg(sequence_arg())
                .arg(shot_arg()),
        )
        .subcommand(
            Command::new("publish")
                .about("Mirror working versions into the department publish location")
                .arg(show_arg())
                .arg(sequence_arg())
                .arg(shot_arg())
                .arg(
                    Arg::new("versions")
                        .help("Versions to publish as <render>/<version>[@owner]")
                        .required(true)
                        .num_args(1..)
                        .index(4),
                )
                .arg(
                    Arg::new("move")
                        .long("move")
                        .help("Move instead of copy")
                        .action(ArgAction::SetTrue),
                )
                .arg(throttle_arg())
                .arg(comment_arg())
                .arg(yes_arg())
                .arg(dry_run_arg("Print the mirror commands without running them")),
        )
        .subcommand(
            Command::new("archive")
                .about("Delete superseded or aged render versions of a sequence")
                .arg(show_arg())
                .arg(sequence_arg())
                .arg(
                    Arg::new("shots")
                        .help("Shots to archive (defaults to every shot of the sequence)")
                        .num_args(1..)
                        .index(3),
                )
                .arg(
                    Arg::new("keep")
                        .short('k')
                        .long("keep")
                        .value_name("COUNT")
                        .help("Most recent versions to keep per render")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    Arg::new("max-age")
                        .long("max-age")
                        .value_name("DAYS")
                        .help("Also delete versions older than DAYS")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("published")
                        .long("published")
                        .help("Archive the publish location instead of the working areas")
                        .action(ArgAction::SetTrue),
                )
                .arg(throttle_arg().help("Throttle recorded with the archive entry"))
                .arg(comment_arg())
                .arg(yes_arg())
                .arg(dry_run_arg("Show what would be deleted without deleting")),
        )
        .subcommand(
            Command::new("report")
                .about("Show storage used per shot of a sequence")
                .arg(show_arg())
                .arg(sequence_arg())
                .arg(
                    Arg::new("final")
                        .long("final")
                        .help("Measure the publish location instead of the working areas")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("log")
                .about("Show publish or archive history")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("publish")
                        .about("Publish history of a shot")
                        .arg(show_arg())
                        .arg(sequence_arg())
                        .arg(shot_arg()),
                )
                .subcommand(
                    Command::new("archive")
                        .about("Archive history of a sequence")
                        .arg(show_arg())
                        .arg(sequence_arg()),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();
    renderpub::init_logging(matches.get_count("verbose"));

    if let Err(err) = run(&matches) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", sub_matches)) => handle_list_command(sub_matches),
        Some(("versions", sub_matches)) => handle_versions_command(sub_matches),
        Some(("publish", sub_matches)) => handle_publish_command(sub_matches),
        Some(("archive", sub_matches)) => handle_archive_command(sub_matches),
        Some(("report", sub_matches)) => handle_report_command(sub_matches),
        Some(("log", sub_matches)) => handle_log_command(sub_matches),
        _ => {
            println!("Welcome to renderpub!");
            println!("Use 'renderpub --help' for more information.");
            Ok(())
        }
    }
}

fn handle_list_command(matches: &clap::ArgMatches) -> Result<()> {
    commands::list::execute(matches)
}

fn handle_versions_command(matches: &clap::ArgMatches) -> Result<()> {
    commands::versions::execute(matches)
}

fn handle_publish_command(matches: &clap::ArgMatches) -> Result<()> {
    commands::publish::execute(matches)
}

fn handle_archive_command(matches: &clap::ArgMatches) -> Result<()> {
    commands::archive::execute(matches)
}

fn handle_report_command(matches: &clap::ArgMatches) -> Result<()> {
    commands::report::execute(matches)
}

fn handle_log_command(matches: &clap::ArgMatches) -> Result<()> {
    commands::history::execute(matches)
}
