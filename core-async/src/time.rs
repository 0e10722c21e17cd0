//! Time-related helpers.
//!
//! ```rust
//! use core_async::time::{timeout, Duration};
//!
//! async fn example() {
//!     let result = timeout(Duration::from_millis(50), async { 7 }).await;
//!     assert_eq!(result.unwrap(), 7);
//! }
//! ```

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
pub use tokio::time::{error::Elapsed, interval, sleep, timeout, Interval, MissedTickBehavior};
