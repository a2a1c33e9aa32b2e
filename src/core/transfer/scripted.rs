//! In-process stand-in for the external mirroring tool
//!
//! [`ScriptedLauncher`] hands out processes whose output and exit code are
//! fixed up front. They honour suspend/resume/kill the way an OS process
//! does: a suspended process produces no output until resumed, and a killed
//! one stops producing output and reports [`KILLED_EXIT_CODE`].
//!
//! Lets the orchestrator be driven deterministically without the real tool.

use crate::platform::process::{LaunchedProcess, ProcessControl, ProcessLauncher, KILLED_EXIT_CODE};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static NEXT_PID: AtomicU32 = AtomicU32::new(40_000);

/// Behaviour of one scripted launch
#[derive(Debug, Clone)]
pub struct Script {
    chunks: Vec<Vec<u8>>,
    exit_code: i32,
    held: bool,
    fail_to_start: bool,
}

impl Script {
    /// Produce `chunks` in order, then exit with `exit_code`
    pub fn new<I, C>(chunks: I, exit_code: i32) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            exit_code,
            held: false,
            fail_to_start: false,
        }
    }

    /// Exit with `exit_code` without producing output
    pub fn exit(exit_code: i32) -> Self {
        Self::new(Vec::<Vec<u8>>::new(), exit_code)
    }

    /// The launch itself fails, as if the program were missing
    pub fn fail_to_start() -> Self {
        Self {
            fail_to_start: true,
            ..Self::exit(0)
        }
    }

    /// After its output the process stays alive until
    /// [`ScriptedProcess::release`] or a kill
    pub fn held(mut self) -> Self {
        self.held = true;
        self
    }
}

#[derive(Debug, Default)]
struct State {
    chunks: VecDeque<Vec<u8>>,
    held: bool,
    suspended: bool,
    killed: bool,
    finished: bool,
    suspend_count: usize,
    resume_count: usize,
}

/// A fake running process
#[derive(Debug)]
pub struct ScriptedProcess {
    pid: u32,
    exit_code: i32,
    state: Mutex<State>,
    changed: Condvar,
}

impl ScriptedProcess {
    fn new(script: &Script) -> Self {
        Self {
            pid: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            exit_code: script.exit_code,
            state: Mutex::new(State {
                chunks: script.chunks.iter().cloned().collect(),
                held: script.held,
                ..Default::default()
            }),
            changed: Condvar::new(),
        }
    }

    /// Let a held process run to its end
    pub fn release(&self) {
        self.state.lock().held = false;
        self.changed.notify_all();
    }

    pub fn suspend_count(&self) -> usize {
        self.state.lock().suspend_count
    }

    pub fn resume_count(&self) -> usize {
        self.state.lock().resume_count
    }

    pub fn was_killed(&self) -> bool {
        self.state.lock().killed
    }

    /// Next output chunk, blocking while suspended or held.
    /// `None` once the process has ended.
    fn next_chunk(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        loop {
            if state.killed {
                state.finished = true;
                self.changed.notify_all();
                return None;
            }
            if !state.suspended {
                if let Some(chunk) = state.chunks.pop_front() {
                    return Some(chunk);
                }
                if !state.held {
                    state.finished = true;
                    self.changed.notify_all();
                    return None;
                }
            }
            self.changed.wait(&mut state);
        }
    }
}

impl ProcessControl for ScriptedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn suspend(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.finished {
            return Err(io::Error::new(io::ErrorKind::NotFound, "process has exited"));
        }
        state.suspended = true;
        state.suspend_count += 1;
        Ok(())
    }

    fn resume(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.finished {
            return Err(io::Error::new(io::ErrorKind::NotFound, "process has exited"));
        }
        state.suspended = false;
        state.resume_count += 1;
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    fn kill(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.finished {
            state.killed = true;
            state.suspended = false;
        }
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    fn is_running(&self) -> bool {
        let state = self.state.lock();
        !state.finished && !state.killed
    }

    fn is_suspended(&self) -> bool {
        let state = self.state.lock();
        state.suspended && !state.finished && !state.killed
    }

    fn exit_code(&self) -> Option<i32> {
        let state = self.state.lock();
        if state.killed {
            Some(KILLED_EXIT_CODE)
        } else if state.finished {
            Some(self.exit_code)
        } else {
            None
        }
    }

    fn wait(&self) -> io::Result<i32> {
        let mut state = self.state.lock();
        while !state.finished && !state.killed {
            self.changed.wait(&mut state);
        }
        Ok(if state.killed {
            KILLED_EXIT_CODE
        } else {
            self.exit_code
        })
    }
}

/// Stdout of a [`ScriptedProcess`]
struct ScriptedOutput {
    process: Arc<ScriptedProcess>,
    current: Vec<u8>,
    pos: usize,
}

impl Read for ScriptedOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.current.len() {
            match self.process.next_chunk() {
                Some(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// One recorded launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// [`ProcessLauncher`] that plays back [`Script`]s in order
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    scripts: Mutex<VecDeque<Script>>,
    launched: Mutex<Vec<Invocation>>,
    processes: Mutex<Vec<Arc<ScriptedProcess>>>,
}

impl ScriptedLauncher {
    pub fn new<I: IntoIterator<Item = Script>>(scripts: I) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.launched.lock().clone()
    }

    /// Process created by the `index`-th successful launch
    pub fn process(&self, index: usize) -> Option<Arc<ScriptedProcess>> {
        self.processes.lock().get(index).cloned()
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().len()
    }

    fn next_script(&self) -> Script {
        self.scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Script::exit(0))
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<LaunchedProcess> {
        self.launched.lock().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        });

        let script = self.next_script();
        if script.fail_to_start {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: program not found", program),
            ));
        }

        let process = Arc::new(ScriptedProcess::new(&script));
        self.processes.lock().push(process.clone());

        Ok(LaunchedProcess {
            control: process.clone(),
            output: Box::new(ScriptedOutput {
                process,
                current: Vec::new(),
                pos: 0,
            }),
        })
    }
}
