//! Engine status streams
//!
//! Pull and push replies from the engine are line-delimited JSON. Each line is
//! decoded by [`status::decode_line`]; [`StreamConsumer`] drives a whole reply
//! to a terminal outcome and reports sampled progress to a [`ProgressSink`].

pub mod consumer;
pub mod sink;
pub mod status;

pub use consumer::{CancelToken, StreamConsumer, StreamSummary};
pub use sink::{NullSink, ProgressEvent, ProgressSink};
pub use status::{ErrorMessage, ProgressDetail, Status};
