//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the
//! [`CancellationToken`] used to stop the scheduler and watcher loops
//! cooperatively: loops poll the token between iterations and never abort
//! work that is already in flight.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! async fn example() {
//!     let counter = Mutex::new(0);
//!     *counter.lock().await += 1;
//!
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     token.cancel();
//!     assert!(child.is_cancelled());
//! }
//! ```

pub use tokio::sync::{broadcast, mpsc, oneshot, Mutex, MutexGuard, Notify, RwLock};
pub use tokio_util::sync::CancellationToken;
