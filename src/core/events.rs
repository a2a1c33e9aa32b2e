// Typed events sent from background workers to the control thread

use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Overall progress, 0-100
    Progress(u8),
    Log(String),
    /// Last reported transfer speed, e.g. `12.5 MB/sec`
    Speed(String),
    /// Terminal event, sent exactly once per operation
    Finished { success: bool },
}

/// Sending half of a worker's event channel.
///
/// A dropped receiver is not an error for the worker: the operation keeps
/// running and its outcome is still returned to whoever joins it.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<Sender<WorkerEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<WorkerEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: WorkerEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        self.send(WorkerEvent::Log(line.into()));
    }

    pub fn progress(&self, percent: u8) {
        self.send(WorkerEvent::Progress(percent.min(100)));
    }

    pub fn finished(&self, success: bool) {
        self.send(WorkerEvent::Finished { success });
    }
}

/// Integer percentage of `done` over `total`, 0 when `total` is 0
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) as f64 / total as f64) * 100.0) as u8
}
