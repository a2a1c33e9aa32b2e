// Platform-specific code module

pub mod identity;
pub mod process;

pub use identity::{current_host, current_user, timestamp_now};
pub use process::{ProcessControl, ProcessLauncher, SystemLauncher};
