// Integration tests for the transfer orchestrator, driven by scripted processes

use renderpub::core::events::{EventSink, WorkerEvent};
use renderpub::core::transfer::scripted::{Script, ScriptedLauncher};
use renderpub::core::transfer::{
    BatchOutcome, MirrorCommand, Throttle, TransferBatch, TransferControl, TransferJob,
    TransferMode, TransferOrchestrator,
};
use renderpub::platform::process::{LaunchedProcess, ProcessControl, ProcessLauncher};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

const PROGRESS_OUTPUT: [&str; 4] = ["  10%\r", "  55.5%\r", "  Speed:   42.7 MB/sec\r", " 100%\r\n"];

/// Writes a marker file into the destination, standing in for the copy
struct CopyingLauncher {
    inner: ScriptedLauncher,
}

impl ProcessLauncher for CopyingLauncher {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<LaunchedProcess> {
        let destination = PathBuf::from(&args[1]);
        fs::create_dir_all(&destination)?;
        fs::write(destination.join("beauty.0001.exr"), b"pixels")?;
        self.inner.launch(program, args)
    }
}

/// Aborts the batch from inside the launch, before the process is tracked
struct AbortingLauncher {
    inner: ScriptedLauncher,
    control: OnceLock<TransferControl>,
}

impl ProcessLauncher for AbortingLauncher {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<LaunchedProcess> {
        if let Some(control) = self.control.get() {
            control.abort();
        }
        self.inner.launch(program, args)
    }
}

fn jobs(root: &TempDir, count: usize, mode: TransferMode) -> Vec<TransferJob> {
    (1..=count)
        .map(|i| {
            TransferJob::new(
                root.path().join("work").join(format!("v00{}", i)),
                root.path().join("publish").join("beauty").join(format!("v00{}", i)),
                mode,
            )
        })
        .collect()
}

fn orchestrator(
    jobs: Vec<TransferJob>,
    throttle: Throttle,
    launcher: Arc<dyn ProcessLauncher>,
) -> TransferOrchestrator {
    TransferOrchestrator::new(
        TransferBatch::new(jobs, throttle).unwrap(),
        MirrorCommand::new("robocopy"),
        launcher,
    )
}

fn run(orchestrator: &TransferOrchestrator) -> (BatchOutcome, Vec<WorkerEvent>) {
    let (tx, rx) = mpsc::channel();
    let outcome = orchestrator.run(&EventSink::new(tx));
    (outcome, rx.try_iter().collect())
}

fn progress_values(events: &[WorkerEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn finished_events(events: &[WorkerEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Finished { success } => Some(*success),
            _ => None,
        })
        .collect()
}

/// Block until a log line equal to `wanted` arrives
fn wait_for_log(events: &Receiver<WorkerEvent>, wanted: &str) -> Vec<WorkerEvent> {
    let mut seen = Vec::new();
    for event in events.iter() {
        let hit = matches!(&event, WorkerEvent::Log(line) if line == wanted);
        seen.push(event);
        if hit {
            return seen;
        }
    }
    panic!("worker ended before logging '{}'", wanted);
}

/// Collect events up to and including `Finished`
fn until_finished(events: &Receiver<WorkerEvent>) -> Vec<WorkerEvent> {
    let mut seen = Vec::new();
    for event in events.iter() {
        let done = matches!(event, WorkerEvent::Finished { .. });
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

#[test]
fn test_successful_batch_reaches_100_once() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([
        Script::new(PROGRESS_OUTPUT, 1),
        Script::new(PROGRESS_OUTPUT, 0),
    ]));
    let orch = orchestrator(jobs(&root, 2, TransferMode::Copy), Throttle::Fast, launcher.clone());

    let (outcome, events) = run(&orch);

    assert!(outcome.success);
    assert_eq!(outcome.completed, 2);
    assert_eq!(outcome.attempted.len(), 2);
    assert_eq!(outcome.last_speed.as_deref(), Some("42.7 MB/sec"));

    let progress = progress_values(&events);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
    assert_eq!(progress.iter().filter(|&&p| p == 100).count(), 1);
    assert_eq!(progress.last(), Some(&100));
    assert_eq!(finished_events(&events), vec![true]);
    assert!(events.contains(&WorkerEvent::Speed("42.7 MB/sec".to_string())));

    // Destination parents are prepared before each launch.
    assert!(root.path().join("publish").join("beauty").is_dir());
    assert_eq!(launcher.launch_count(), 2);
}

#[test]
fn test_failure_exit_code_stops_batch_and_keeps_finished_jobs() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(CopyingLauncher {
        inner: ScriptedLauncher::new([Script::new(PROGRESS_OUTPUT, 0), Script::exit(9)]),
    });
    let batch_jobs = jobs(&root, 2, TransferMode::Copy);
    let first_destination = batch_jobs[0].destination.clone();
    let orch = orchestrator(batch_jobs, Throttle::Fast, launcher);

    let (outcome, events) = run(&orch);

    assert!(!outcome.success);
    assert_eq!(outcome.completed, 1);
    assert_eq!(outcome.attempted.len(), 2);
    assert!(first_destination.join("beauty.0001.exr").exists());
    assert!(!progress_values(&events).contains(&100));
    assert_eq!(finished_events(&events), vec![false]);
    assert!(outcome
        .log
        .iter()
        .any(|l| l.contains("failed with exit code 9")));
}

#[test]
fn test_start_failure_skips_remaining_jobs() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([
        Script::fail_to_start(),
        Script::exit(0),
    ]));
    let orch = orchestrator(jobs(&root, 2, TransferMode::Copy), Throttle::Fast, launcher.clone());

    let (outcome, events) = run(&orch);

    assert!(!outcome.success);
    assert_eq!(outcome.completed, 0);
    assert_eq!(launcher.launch_count(), 1);
    assert_eq!(finished_events(&events), vec![false]);
    assert!(outcome.log.iter().any(|l| l.starts_with("ERROR: Could not start")));
}

#[test]
fn test_informational_exit_codes_count_as_success() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([Script::exit(7)]));
    let orch = orchestrator(jobs(&root, 1, TransferMode::Copy), Throttle::Fast, launcher);

    let (outcome, _) = run(&orch);
    assert!(outcome.success);
}

#[test]
fn test_mode_and_throttle_reach_the_command_line() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([Script::exit(0)]));
    let orch = orchestrator(
        jobs(&root, 1, TransferMode::Move),
        Throttle::Slow {
            inter_packet_gap_ms: 100,
        },
        launcher.clone(),
    );

    let (outcome, _) = run(&orch);
    assert!(outcome.success);

    let invocation = &launcher.invocations()[0];
    assert_eq!(invocation.program, "robocopy");
    assert!(invocation.args.contains(&"/MOV".to_string()));
    assert!(invocation.args.contains(&"/IPG:100".to_string()));
    assert!(!invocation.args.contains(&"/MT".to_string()));
    assert!(outcome.log.iter().any(|l| l.starts_with("Moving 'v001'")));
}

#[test]
fn test_pause_then_resume_leaves_outcome_unchanged() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([
        Script::new(["  10%\r"], 0).held(),
        Script::new(PROGRESS_OUTPUT, 0),
    ]));
    let orch = orchestrator(jobs(&root, 2, TransferMode::Copy), Throttle::Fast, launcher.clone());
    let handle = orch.spawn();

    wait_for_log(&handle.events, "10%");
    let process = launcher.process(0).unwrap();

    handle.pause();
    assert!(process.is_suspended());
    handle.pause(); // already suspended: no-op
    handle.resume();
    assert!(!process.is_suspended());
    handle.resume(); // not suspended: no-op
    process.release();

    let outcome = handle.join();
    assert!(outcome.success);
    assert_eq!(outcome.completed, 2);
    assert_eq!(process.suspend_count(), 1);
    assert_eq!(process.resume_count(), 1);

    let paused = outcome.log.iter().filter(|l| *l == "--- PROCESS PAUSED ---").count();
    let resumed = outcome.log.iter().filter(|l| *l == "--- PROCESS RESUMED ---").count();
    assert_eq!((paused, resumed), (1, 1));
}

#[test]
fn test_pause_without_running_process_is_noop() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([Script::exit(0)]));
    let orch = orchestrator(jobs(&root, 1, TransferMode::Copy), Throttle::Fast, launcher);
    let control = orch.control(EventSink::discard());

    control.pause();
    control.resume();
    assert!(!control.is_paused());

    let (outcome, _) = run(&orch);
    assert!(outcome.success);
    assert!(!outcome.log.iter().any(|l| l.starts_with("---")));
}

#[test]
fn test_abort_kills_process_and_starts_nothing_else() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([
        Script::new(["  20%\r"], 0).held(),
        Script::exit(0),
    ]));
    let orch = orchestrator(jobs(&root, 2, TransferMode::Copy), Throttle::Fast, launcher.clone());
    let handle = orch.spawn();

    wait_for_log(&handle.events, "20%");
    handle.abort();
    handle.abort(); // second abort is ignored

    let remaining = until_finished(&handle.events);
    let outcome = handle.join();

    assert!(!outcome.success);
    assert_eq!(outcome.completed, 0);
    assert_eq!(launcher.launch_count(), 1);
    assert!(launcher.process(0).unwrap().was_killed());
    assert_eq!(finished_events(&remaining), vec![false]);
    assert_eq!(
        outcome.log.iter().filter(|l| *l == "--- ABORTING ---").count(),
        1
    );
}

#[test]
fn test_abort_while_paused_still_terminates() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([Script::new(["  5%\r"], 0).held()]));
    let orch = orchestrator(jobs(&root, 1, TransferMode::Copy), Throttle::Fast, launcher.clone());
    let handle = orch.spawn();

    wait_for_log(&handle.events, "5%");
    handle.pause();
    handle.abort();

    let outcome = handle.join();
    assert!(!outcome.success);
    assert!(launcher.process(0).unwrap().was_killed());
}

#[test]
fn test_abort_during_launch_kills_new_process() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(AbortingLauncher {
        inner: ScriptedLauncher::new([Script::new(["  20%\r"], 0).held(), Script::exit(0)]),
        control: OnceLock::new(),
    });
    let orch = orchestrator(jobs(&root, 2, TransferMode::Copy), Throttle::Fast, launcher.clone());

    let (tx, rx) = mpsc::channel();
    let sink = EventSink::new(tx);
    assert!(launcher.control.set(orch.control(sink.clone())).is_ok());

    let outcome = orch.run(&sink);
    let events: Vec<WorkerEvent> = rx.try_iter().collect();

    assert!(!outcome.success);
    assert_eq!(launcher.inner.launch_count(), 1);
    assert!(launcher.inner.process(0).unwrap().was_killed());
    assert_eq!(finished_events(&events), vec![false]);
}

#[test]
fn test_preview_lists_commands_without_side_effects() {
    let root = TempDir::new().unwrap();
    let launcher = Arc::new(ScriptedLauncher::default());
    let orch = orchestrator(
        jobs(&root, 2, TransferMode::Move),
        Throttle::Slow {
            inter_packet_gap_ms: 250,
        },
        launcher.clone(),
    );

    let lines = orch.preview();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("robocopy "));
    assert!(lines[0].contains("v001"));
    assert!(lines[1].contains("v002"));
    assert!(lines.iter().all(|l| l.contains("/MOV") && l.contains("/IPG:250")));
    assert_eq!(launcher.launch_count(), 0);
    assert!(!root.path().join("publish").exists());
}
