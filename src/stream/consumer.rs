//! Consumption of line-delimited engine status streams
//!
//! A stream ends in exactly one of: success (clean end of input), a decode
//! failure, an error reported by the engine inside the stream, an I/O failure
//! of the underlying reader, or cancellation. Nothing is retried or resumed
//! here; callers restart the whole operation to retry.

use super::sink::{ProgressEvent, ProgressSink};
use super::status::{self, Status};
use crate::config::ProgressPolicy;
use crate::error::{Result, SyncError};
use log::debug;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Shared flag that aborts consumption before the next line
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a fully consumed stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub lines: usize,
    pub last_status: Option<Status>,
}

pub struct StreamConsumer<S> {
    sink: S,
    policy: ProgressPolicy,
    cancel: Option<CancelToken>,
}

impl<S: ProgressSink> StreamConsumer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            policy: ProgressPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_policy(mut self, policy: ProgressPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Read `reader` to the end, reporting sampled progress to the sink
    pub fn consume<R: BufRead>(&self, mut reader: R, image: &str, command: &str) -> Result<StreamSummary> {
        let mut sampler = Sampler::new(self.policy);
        let mut summary = StreamSummary::default();
        let mut buf = Vec::new();

        loop {
            if self.is_cancelled() {
                debug!("[{}] {} cancelled after {} lines", command, image, summary.lines);
                return Err(SyncError::Cancelled);
            }

            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(SyncError::Stream)? == 0 {
                break;
            }

            let (status, error) = status::decode_line(trim_line_ending(&buf))?;
            if error.is_error() {
                return Err(SyncError::Remote(error.error));
            }

            if sampler.should_emit(summary.lines) {
                self.sink.progress(&ProgressEvent {
                    command,
                    image,
                    line: summary.lines,
                    status: &status,
                });
            }

            summary.lines += 1;
            summary.last_status = Some(status);
        }

        self.sink.complete(command, image);
        Ok(summary)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

struct Sampler {
    policy: ProgressPolicy,
    last: Option<Instant>,
}

impl Sampler {
    fn new(policy: ProgressPolicy) -> Self {
        Self { policy, last: None }
    }

    fn should_emit(&mut self, line: usize) -> bool {
        match self.policy {
            ProgressPolicy::EveryNth(every) => line % every.max(1) == 0,
            ProgressPolicy::Interval(interval) => {
                let now = Instant::now();
                let due = self.last.is_none_or(|last| now.duration_since(last) >= interval);
                if due {
                    self.last = Some(now);
                }
                due
            }
        }
    }
}
