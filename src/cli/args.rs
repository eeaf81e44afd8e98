//! Command-line argument parsing

use crate::retry::Backoff;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "image-sinker")]
#[command(about = "A tool to sync container images to another container registry")]
#[command(version, author)]
pub struct Args {
    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Retry attempts for failed operations
    #[arg(
        long = "retry-attempts",
        global = true,
        help = "Number of attempts for each pull, push or tag [default: 3]"
    )]
    pub retry_attempts: Option<u32>,

    /// Delay between retries in seconds
    #[arg(
        long = "retry-delay",
        global = true,
        help = "Seconds to wait between attempts [default: 5]"
    )]
    pub retry_delay: Option<u64>,

    /// Growth of the delay between retries
    #[arg(
        long = "retry-backoff",
        global = true,
        help = "Delay growth between attempts: fixed, linear or exponential [default: fixed]"
    )]
    pub retry_backoff: Option<Backoff>,

    /// Progress sampling
    #[arg(
        long = "progress-every",
        global = true,
        help = "Log progress every N status lines [default: 25]"
    )]
    pub progress_every: Option<usize>,

    /// Time-based progress sampling
    #[arg(
        long = "progress-interval",
        global = true,
        conflicts_with = "progress_every",
        help = "Log progress at most once every N seconds instead of by line count"
    )]
    pub progress_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pull images into the local engine
    Pull {
        /// Images to pull
        #[arg(required = true)]
        images: Vec<String>,

        /// Skip images the engine already has
        #[arg(long = "missing-only")]
        missing_only: bool,
    },
    /// Push images from the local engine
    Push {
        /// Images to push
        #[arg(required = true)]
        images: Vec<String>,
    },
    /// Tag a local image with another name
    Tag { source: String, target: String },
    /// Pull an image, retag it and push it to the target registry
    Mirror { source: String, target: String },
    /// Show how registry paths are decomposed
    Inspect {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}
