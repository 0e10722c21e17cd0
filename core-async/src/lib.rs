//! Async runtime facade for the media mirror workspace.
//!
//! Every `core-*` and `bridge-*` crate reaches the executor, timers, channels,
//! async filesystem calls and subprocesses through this crate instead of
//! depending on tokio directly. Keeping the surface in one place means the
//! engine only ever sees the handful of primitives it actually needs.
//!
//! # Modules
//!
//! - `fs`: async filesystem calls, including symlink creation
//! - `process`: subprocess spawning for external inspection tools
//! - `runtime`: runtime construction for binaries
//! - `signal`: shutdown signals for long-running binaries
//! - `sync`: channels, locks and the cooperative `CancellationToken`
//! - `task`: task spawning, including `spawn_blocking` for directory walks
//! - `time`: sleep, timeout and interval helpers
//!
//! The `select!` macro is re-exported for loops that race a sleep against
//! their cancellation token.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod fs;
pub mod process;
pub mod runtime;
pub mod signal;
pub mod sync;
pub mod task;
pub mod time;

pub use sync::CancellationToken;
pub use tokio::select;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
