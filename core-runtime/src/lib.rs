//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media mirror:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the sync engine and the
//! service facade depend on. It establishes the logging conventions, the
//! validated configuration model and the event broadcasting mechanism used by
//! every background loop.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
