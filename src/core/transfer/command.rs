// Command line of the external mirroring tool

use super::{Throttle, TransferJob, TransferMode};

/// Flags passed on every job: recurse into subdirectories, retry twice
/// waiting five seconds, no job header/summary, report ETA.
pub const BASE_FLAGS: [&str; 6] = ["/E", "/R:2", "/W:5", "/NJH", "/NJS", "/ETA"];
pub const MOVE_FLAG: &str = "/MOV";
pub const MULTI_THREAD_FLAG: &str = "/MT";

/// Builds the invocation for one transfer job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorCommand {
    program: String,
}

impl MirrorCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self, job: &TransferJob, throttle: Throttle) -> Vec<String> {
        let mut args = vec![
            job.source.to_string_lossy().to_string(),
            job.destination.to_string_lossy().to_string(),
        ];
        args.extend(BASE_FLAGS.iter().map(|f| f.to_string()));

        if job.mode == TransferMode::Move {
            args.push(MOVE_FLAG.to_string());
        }

        match throttle {
            Throttle::Fast => args.push(MULTI_THREAD_FLAG.to_string()),
            Throttle::Slow { inter_packet_gap_ms } => {
                args.push(format!("/IPG:{}", inter_packet_gap_ms))
            }
        }

        args
    }

    /// Printable form of the invocation
    pub fn display(&self, job: &TransferJob, throttle: Throttle) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args(job, throttle).into_iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a
            }
        }));
        parts.join(" ")
    }
}
