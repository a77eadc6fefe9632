//! # pcmix Common Library
//!
//! Shared definitions used by the pcmix engine and its tools:
//! - Canonical PCM format and format descriptors
//! - Event types (music/sound notifications) and the listener trait
//! - Engine configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod format;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use format::{PcmFormat, SampleEncoding};
