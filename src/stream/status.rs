//! Decoding of single status lines streamed by the engine

use crate::error::{Result, SyncError};
use serde::{Deserialize, Deserializer, Serialize};

/// Bytes transferred against total bytes for one layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub current: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
}

/// One decoded status line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    #[serde(rename = "status", deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "progressDetail", deserialize_with = "null_as_default")]
    pub progress_detail: ProgressDetail,
}

impl Status {
    /// Short human phrase for this status
    ///
    /// Daemon phrasing varies between versions, so anything unrecognised is
    /// reported as plain `Processing`.
    pub fn message(&self) -> String {
        if self.message.contains("Pulling from") || self.message.contains("The push refers to") {
            return "Started".to_string();
        }

        if self.progress_detail.total > 0 {
            return format!(
                "Processing {}B of {}B",
                self.progress_detail.current, self.progress_detail.total
            );
        }

        "Processing".to_string()
    }
}

/// Error field of a status line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub error: String,
}

impl ErrorMessage {
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Decode one line as both a [`Status`] and an [`ErrorMessage`]
///
/// `null`, whether for a field or the whole line, leaves the zero value.
pub fn decode_line(line: &[u8]) -> Result<(Status, ErrorMessage)> {
    let status = serde_json::from_slice::<Option<Status>>(line).map_err(SyncError::DecodeStatus)?;
    let error = serde_json::from_slice::<Option<ErrorMessage>>(line).map_err(SyncError::DecodeError)?;
    Ok((status.unwrap_or_default(), error.unwrap_or_default()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn status(message: &str, current: i64, total: i64) -> Status {
        Status {
            message: message.to_string(),
            id: String::new(),
            progress_detail: ProgressDetail { current, total },
        }
    }

    #[test]
    fn test_decode_full_line() {
        let line = br#"{"status":"Downloading","id":"a1b2","progressDetail":{"current":512,"total":2048}}"#;
        let (status, error) = decode_line(line).unwrap();
        assert_eq!(status.message, "Downloading");
        assert_eq!(status.id, "a1b2");
        assert_eq!(status.progress_detail, ProgressDetail { current: 512, total: 2048 });
        assert!(!error.is_error());
    }

    #[test]
    fn test_absent_fields_default() {
        let (status, error) = decode_line(br#"{"status":"Pull complete","progressDetail":{}}"#).unwrap();
        assert_eq!(status.id, "");
        assert_eq!(status.progress_detail, ProgressDetail::default());
        assert_eq!(error.error, "");

        let (status, _) = decode_line(b"{}").unwrap();
        assert_eq!(status, Status::default());
    }

    #[test]
    fn test_null_fields_default() {
        let (status, error) = decode_line(br#"{"status":"Downloading","error":null}"#).unwrap();
        assert_eq!(status.message, "Downloading");
        assert!(!error.is_error());

        let (status, _) = decode_line(br#"{"status":null,"id":null,"progressDetail":null}"#).unwrap();
        assert_eq!(status, Status::default());

        let (status, _) =
            decode_line(br#"{"status":"Extracting","progressDetail":{"current":null,"total":null}}"#).unwrap();
        assert_eq!(status.progress_detail, ProgressDetail::default());
        assert_eq!(status.message(), "Processing");
    }

    #[test]
    fn test_null_line_defaults() {
        let (status, error) = decode_line(b"null").unwrap();
        assert_eq!(status, Status::default());
        assert_eq!(error, ErrorMessage::default());
    }

    #[test]
    fn test_error_line() {
        let (status, error) = decode_line(br#"{"error":"manifest unknown"}"#).unwrap();
        assert_eq!(status, Status::default());
        assert!(error.is_error());
        assert_eq!(error.error, "manifest unknown");
    }

    #[test]
    fn test_invalid_json_is_decode_failure() {
        let err = decode_line(b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().starts_with("unmarshal status"));
    }

    #[test]
    fn test_wrong_shape_is_decode_failure() {
        let err = decode_line(br#"{"status":42}"#).unwrap_err();
        assert!(matches!(err, SyncError::DecodeStatus(_)));

        let err = decode_line(br#"{"error":{"code":1}}"#).unwrap_err();
        assert!(matches!(err, SyncError::DecodeError(_)));
    }

    #[test]
    fn test_started_message() {
        assert_eq!(status("latest: Pulling from library/nginx", 0, 0).message(), "Started");
        assert_eq!(
            status("The push refers to repository [docker.io/library/nginx]", 0, 0).message(),
            "Started"
        );
    }

    #[test]
    fn test_processing_message() {
        assert_eq!(status("Downloading", 100, 400).message(), "Processing 100B of 400B");
        assert_eq!(status("Waiting", 0, 0).message(), "Processing");
        assert_eq!(status("", 5, -1).message(), "Processing");
    }

    #[test]
    fn test_message_is_one_of_known_phrases() {
        let samples = [
            status("", 0, 0),
            status("Pulling fs layer", 0, 0),
            status("Extracting", 10, 10),
            status("Pulling from x", 10, 10),
            status("Digest: sha256:abc", i64::MAX, i64::MAX),
        ];

        for sample in samples {
            let message = sample.message();
            let known = message == "Started"
                || message == "Processing"
                || (message.starts_with("Processing ") && message.ends_with('B') && message.contains("B of "));
            assert!(known, "unexpected message {message:?}");
        }
    }
}
