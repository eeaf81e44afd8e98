//! Progress notifications emitted while a status stream is consumed

use super::status::Status;

/// A sampled line of a status stream
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    pub command: &'a str,
    pub image: &'a str,
    /// Zero-based index of the line in the stream
    pub line: usize,
    pub status: &'a Status,
}

impl ProgressEvent<'_> {
    pub fn message(&self) -> String {
        self.status.message()
    }
}

/// Receiver of progress and completion notifications
pub trait ProgressSink {
    fn progress(&self, event: &ProgressEvent<'_>);

    fn complete(&self, command: &str, image: &str);
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&self, _event: &ProgressEvent<'_>) {}

    fn complete(&self, _command: &str, _image: &str) {}
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn progress(&self, event: &ProgressEvent<'_>) {
        (**self).progress(event)
    }

    fn complete(&self, command: &str, image: &str) {
        (**self).complete(command, image)
    }
}
