//! Subprocess spawning.
//!
//! Used for bounded-timeout invocations of external media inspection tools.
//! Callers should combine [`Command::kill_on_drop`] with
//! [`crate::time::timeout`] so an expired probe never leaves a child behind.

pub use std::process::{ExitStatus, Output, Stdio};
pub use tokio::process::{Child, Command};
