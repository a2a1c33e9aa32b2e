//! OS process control for external transfer tools
//!
//! [`ProcessControl`] is the capability the transfer orchestrator needs over
//! a running child: freeze and thaw it at the scheduler level, kill it, and
//! query its state. [`SystemLauncher`] provides the real backend (signals on
//! Unix, thread suspension on Windows).

use parking_lot::Mutex;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit code reported for a process terminated by a signal
pub const KILLED_EXIT_CODE: i32 = -1;

pub trait ProcessControl: Send + Sync {
    fn pid(&self) -> u32;
    fn suspend(&self) -> io::Result<()>;
    fn resume(&self) -> io::Result<()>;
    fn kill(&self) -> io::Result<()>;
    fn is_running(&self) -> bool;
    fn is_suspended(&self) -> bool;
    /// Exit code once the process has ended
    fn exit_code(&self) -> Option<i32>;
    /// Block until the process ends and return its exit code
    fn wait(&self) -> io::Result<i32>;
}

/// A started process: its control handle and its standard output
pub struct LaunchedProcess {
    pub control: Arc<dyn ProcessControl>,
    pub output: Box<dyn Read + Send>,
}

/// Starts external processes
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<LaunchedProcess>;
}

/// Launches real OS processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, program: &str, args: &[String]) -> io::Result<LaunchedProcess> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout pipe missing"))?;

        log::debug!("started {} (pid {})", program, child.id());

        Ok(LaunchedProcess {
            control: Arc::new(ChildProcess::new(child)),
            output: Box::new(stdout),
        })
    }
}

/// [`ProcessControl`] over a `std::process::Child`
pub struct ChildProcess {
    pid: u32,
    child: Mutex<Child>,
    exit: Mutex<Option<i32>>,
    suspended: AtomicBool,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Mutex::new(child),
            exit: Mutex::new(None),
            suspended: AtomicBool::new(false),
        }
    }

    fn poll_exit(&self) -> io::Result<Option<i32>> {
        if let Some(code) = *self.exit.lock() {
            return Ok(Some(code));
        }
        let status = self.child.lock().try_wait()?;
        if let Some(status) = status {
            let code = status.code().unwrap_or(KILLED_EXIT_CODE);
            *self.exit.lock() = Some(code);
            self.suspended.store(false, Ordering::Relaxed);
            return Ok(Some(code));
        }
        Ok(None)
    }
}

impl ProcessControl for ChildProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn suspend(&self) -> io::Result<()> {
        os::suspend(self.pid)?;
        self.suspended.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn resume(&self) -> io::Result<()> {
        os::resume(self.pid)?;
        self.suspended.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn kill(&self) -> io::Result<()> {
        if self.poll_exit()?.is_some() {
            return Ok(());
        }
        self.child.lock().kill()
    }

    fn is_running(&self) -> bool {
        matches!(self.poll_exit(), Ok(None))
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed) && self.is_running()
    }

    fn exit_code(&self) -> Option<i32> {
        self.poll_exit().ok().flatten()
    }

    fn wait(&self) -> io::Result<i32> {
        // Poll instead of Child::wait so kill() can take the lock meanwhile.
        loop {
            if let Some(code) = self.poll_exit()? {
                return Ok(code);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

#[cfg(unix)]
mod os {
    use std::io;

    fn signal(pid: u32, sig: libc::c_int) -> io::Result<()> {
        let ret = unsafe { libc::kill(pid as libc::pid_t, sig) };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub fn suspend(pid: u32) -> io::Result<()> {
        signal(pid, libc::SIGSTOP)
    }

    pub fn resume(pid: u32) -> io::Result<()> {
        signal(pid, libc::SIGCONT)
    }
}

#[cfg(windows)]
mod os {
    use std::io;
    use std::mem;
    use winapi::shared::minwindef::DWORD;
    use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
    use winapi::um::processthreadsapi::{OpenThread, ResumeThread, SuspendThread};
    use winapi::um::tlhelp32::{
        CreateToolhelp32Snapshot, Thread32First, Thread32Next, TH32CS_SNAPTHREAD, THREADENTRY32,
    };
    use winapi::um::winnt::{HANDLE, THREAD_SUSPEND_RESUME};

    /// Apply `op` to every thread owned by `pid`
    fn for_each_thread(pid: u32, op: unsafe extern "system" fn(HANDLE) -> DWORD) -> io::Result<()> {
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0);
            if snapshot == INVALID_HANDLE_VALUE {
                return Err(io::Error::last_os_error());
            }

            let mut entry: THREADENTRY32 = mem::zeroed();
            entry.dwSize = mem::size_of::<THREADENTRY32>() as u32;

            let mut touched = 0usize;
            let mut has_entry = Thread32First(snapshot, &mut entry) != 0;
            while has_entry {
                if entry.th32OwnerProcessID == pid {
                    let thread = OpenThread(THREAD_SUSPEND_RESUME, 0, entry.th32ThreadID);
                    if !thread.is_null() {
                        if op(thread) != DWORD::MAX {
                            touched += 1;
                        }
                        CloseHandle(thread);
                    }
                }
                has_entry = Thread32Next(snapshot, &mut entry) != 0;
            }
            CloseHandle(snapshot);

            if touched == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no threads found for process {}", pid),
                ));
            }
            Ok(())
        }
    }

    pub fn suspend(pid: u32) -> io::Result<()> {
        for_each_thread(pid, SuspendThread)
    }

    pub fn resume(pid: u32) -> io::Result<()> {
        for_each_thread(pid, ResumeThread)
    }
}
