//! Container engine access
//!
//! [`ImageEngine`] is the seam between image sync logic and the daemon;
//! [`EngineClient`] implements it over the Docker engine HTTP API.

pub mod client;
pub mod transport;

pub use client::{EngineClient, StatusStream};

use crate::error::Result;
use crate::image::RegistryPath;
use std::io::BufRead;

/// Image operations offered by a container engine
pub trait ImageEngine {
    /// Line-delimited status reply of a pull or push
    type Stream: BufRead;

    fn image_pull(&self, image: &RegistryPath) -> Result<Self::Stream>;

    fn image_push(&self, image: &RegistryPath) -> Result<Self::Stream>;

    fn image_tag(&self, source: &RegistryPath, target: &RegistryPath) -> Result<()>;

    fn image_exists(&self, image: &RegistryPath) -> Result<bool>;
}
