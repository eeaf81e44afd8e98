//! Image Sinker Library
//!
//! Syncs container images between registries by driving a container engine:
//! registry paths are decomposed by [`image::RegistryPath`], pull and push
//! replies are consumed by [`stream::StreamConsumer`], and [`sync::ImageSyncer`]
//! applies per-operation retry policies around them.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod logging;
pub mod retry;
pub mod stream;
pub mod sync;

pub use config::{EngineConfig, EngineHost, ProgressPolicy, SyncConfig};
pub use engine::{EngineClient, ImageEngine};
pub use error::{ErrorKind, Result, SyncError};
pub use image::RegistryPath;
pub use retry::{Backoff, RetryPolicy};
pub use sync::ImageSyncer;
