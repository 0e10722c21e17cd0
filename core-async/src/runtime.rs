//! Runtime construction for binaries.
//!
//! Library crates never build their own runtime; the `media-sync` binary uses
//! [`Builder`] to create a multi-threaded runtime at startup.

pub use tokio::runtime::{Builder, Handle, Runtime};
