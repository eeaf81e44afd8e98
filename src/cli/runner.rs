//! Dispatches parsed arguments to image operations

use super::args::{Args, Command};
use crate::config::{ProgressPolicy, SyncConfig};
use crate::engine::{EngineClient, ImageEngine};
use crate::error::Result;
use crate::image::RegistryPath;
use crate::logging::LogSink;
use crate::sync::ImageSyncer;
use std::time::Duration;

pub struct Runner {
    args: Args,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    /// Environment settings with command-line overrides applied
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = SyncConfig::from_env();

        for policy in [&mut config.retry.pull, &mut config.retry.push, &mut config.retry.tag] {
            if let Some(attempts) = self.args.retry_attempts {
                policy.attempts = attempts;
            }
            if let Some(delay) = self.args.retry_delay {
                policy.delay = Duration::from_secs(delay);
            }
            if let Some(backoff) = self.args.retry_backoff {
                policy.backoff = backoff;
            }
        }
        if let Some(every) = self.args.progress_every {
            config.progress = ProgressPolicy::EveryNth(every);
        }
        if let Some(secs) = self.args.progress_interval {
            config.progress = ProgressPolicy::Interval(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn run(&self) -> Result<()> {
        if let Command::Inspect { paths } = &self.args.command {
            for path in paths {
                println!("{}", describe_path(&RegistryPath::from(path.as_str())));
            }
            return Ok(());
        }

        let config = self.sync_config()?;
        let syncer = ImageSyncer::new(EngineClient::from_env()?, config, LogSink);
        self.dispatch(&syncer)
    }

    fn dispatch<E: ImageEngine>(&self, syncer: &ImageSyncer<E, LogSink>) -> Result<()> {
        match &self.args.command {
            Command::Pull {
                images,
                missing_only,
            } => {
                for image in images {
                    let image = RegistryPath::from(image.as_str());
                    if *missing_only {
                        syncer.pull_missing(&image)?;
                    } else {
                        syncer.pull(&image)?;
                    }
                }
            }
            Command::Push { images } => {
                for image in images {
                    syncer.push(&RegistryPath::from(image.as_str()))?;
                }
            }
            Command::Tag { source, target } => {
                syncer.tag(
                    &RegistryPath::from(source.as_str()),
                    &RegistryPath::from(target.as_str()),
                )?;
            }
            Command::Mirror { source, target } => {
                syncer.mirror(
                    &RegistryPath::from(source.as_str()),
                    &RegistryPath::from(target.as_str()),
                )?;
            }
            Command::Inspect { .. } => {}
        }

        Ok(())
    }
}

/// One-line breakdown of a registry path
pub fn describe_path(path: &RegistryPath) -> String {
    format!(
        "{}: host={:?} repository={:?} tag={:?} digest={:?}",
        path,
        path.host(),
        path.repository(),
        path.tag(),
        path.digest()
    )
}
