//! Per-image pull, push and tag with retries
//!
//! Each attempt issues a fresh engine request and consumes its whole reply.
//! Errors are wrapped with the command and image once all attempts are spent.

use crate::config::SyncConfig;
use crate::engine::ImageEngine;
use crate::error::{Result, SyncError};
use crate::image::RegistryPath;
use crate::stream::{CancelToken, ProgressSink, StreamConsumer, StreamSummary};
use log::{debug, info};

pub struct ImageSyncer<E, S> {
    engine: E,
    config: SyncConfig,
    sink: S,
    cancel: CancelToken,
}

impl<E: ImageEngine, S: ProgressSink> ImageSyncer<E, S> {
    pub fn new(engine: E, config: SyncConfig, sink: S) -> Self {
        Self {
            engine,
            config,
            sink,
            cancel: CancelToken::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Token that aborts the stream currently being consumed
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn pull(&self, image: &RegistryPath) -> Result<StreamSummary> {
        describe("pull", image);
        self.config
            .retry
            .pull
            .run("pull", |_| {
                let stream = self.engine.image_pull(image)?;
                self.consumer().consume(stream, image.as_str(), "pull")
            })
            .map_err(|e| e.in_image("pull", image.as_str()))
    }

    /// Pull only when the engine does not already hold the image
    pub fn pull_missing(&self, image: &RegistryPath) -> Result<Option<StreamSummary>> {
        let exists = self
            .engine
            .image_exists(image)
            .map_err(|e| e.in_image("pull", image.as_str()))?;

        if exists {
            info!("[pull] {} already present.", image);
            return Ok(None);
        }

        self.pull(image).map(Some)
    }

    pub fn push(&self, image: &RegistryPath) -> Result<StreamSummary> {
        describe("push", image);
        self.config
            .retry
            .push
            .run("push", |_| {
                let stream = self.engine.image_push(image)?;
                self.consumer().consume(stream, image.as_str(), "push")
            })
            .map_err(|e| e.in_image("push", image.as_str()))
    }

    pub fn tag(&self, source: &RegistryPath, target: &RegistryPath) -> Result<()> {
        self.config
            .retry
            .tag
            .run("tag", |_| self.engine.image_tag(source, target))
            .map_err(|e| e.in_image("tag", source.as_str()))?;

        info!("[tag] {} -> {} complete.", source, target);
        Ok(())
    }

    /// Pull `source`, tag it as `target` and push `target`
    pub fn mirror(&self, source: &RegistryPath, target: &RegistryPath) -> Result<StreamSummary> {
        if target.repository().is_empty() {
            return Err(SyncError::Config(format!("target {target} has no repository"))
                .in_image("mirror", source.as_str()));
        }

        self.pull(source)?;
        self.tag(source, target)?;
        self.push(target)
    }

    fn consumer(&self) -> StreamConsumer<&S> {
        StreamConsumer::new(&self.sink)
            .with_policy(self.config.progress)
            .with_cancel(self.cancel.clone())
    }
}

fn describe(command: &str, image: &RegistryPath) {
    debug!(
        "[{}] {} host={:?} repository={:?} tag={:?} digest={:?}",
        command,
        image,
        image.host(),
        image.repository(),
        image.tag(),
        image.digest()
    );
}
