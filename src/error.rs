//! Error types for stream decoding.
//!
//! The decoder itself never aborts on corrupt input: framing and payload
//! errors are consumed internally and drive the resynchronization state
//! machine (see [`crate::decoder`]). The variants here surface at the
//! API edges instead — direct frame-store mutation, run encoding, and
//! byte-source failures in the async driver.
//!
//! Errors carry an [`is_recoverable`](PixelwireError::is_recoverable)
//! classification: recoverable means the stream can continue (possibly
//! after resync), not that the failing call can be retried verbatim.

use thiserror::Error;

use crate::wire::Channel;

/// Result type alias for decoding operations.
pub type Result<T, E = PixelwireError> = std::result::Result<T, E>;

/// Main error type for stream decoding operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PixelwireError {
    #[error("framing error: expected packet id {expected}, got {got}")]
    Framing { expected: u8, got: u8 },

    #[error("invalid channel bits {bits:#04b} in misc byte")]
    InvalidChannel { bits: u8 },

    #[error(
        "run out of bounds: {channel:?} row {row}, cols {start_col}..{end_col} \
         on a {width}x{height} plane"
    )]
    OutOfBounds {
        channel: Channel,
        row: u16,
        start_col: u16,
        end_col: u32,
        width: usize,
        height: usize,
    },

    #[error("run not encodable: {details}")]
    Encode { details: String },

    #[error("byte source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("decoder driver stopped: {context}")]
    Stopped { context: String },
}

impl PixelwireError {
    /// Whether the stream can continue past this error.
    ///
    /// Framing and payload corruption are recovered via resync; a dead
    /// byte source or an unencodable run is terminal for the operation.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PixelwireError::Framing { .. } => true,
            PixelwireError::InvalidChannel { .. } => true,
            PixelwireError::OutOfBounds { .. } => true,
            PixelwireError::Encode { .. } => false,
            PixelwireError::Source { .. } => false,
            PixelwireError::Stopped { .. } => false,
        }
    }

    /// Helper constructor for encoding errors.
    pub fn encode_error(details: impl Into<String>) -> Self {
        PixelwireError::Encode { details: details.into() }
    }

    /// Helper constructor for byte-source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        PixelwireError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for byte-source failures with a cause.
    pub fn source_failed_with(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        PixelwireError::Source { reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for PixelwireError {
    fn from(err: std::io::Error) -> Self {
        PixelwireError::Source { reason: "I/O error".to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<PixelwireError>();

        let error = PixelwireError::source_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recoverability_classification() {
        assert!(PixelwireError::Framing { expected: 3, got: 9 }.is_recoverable());
        assert!(PixelwireError::InvalidChannel { bits: 3 }.is_recoverable());
        assert!(!PixelwireError::source_failed("port gone").is_recoverable());
        assert!(!PixelwireError::encode_error("too long").is_recoverable());
    }

    #[test]
    fn messages_carry_context() {
        let err = PixelwireError::Framing { expected: 12, got: 200 };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("200"));

        let err = PixelwireError::OutOfBounds {
            channel: Channel::ChromaU,
            row: 191,
            start_col: 500,
            end_col: 520,
            width: 512,
            height: 192,
        };
        assert!(err.to_string().contains("ChromaU"));
    }

    #[test]
    fn io_errors_convert_to_source_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "port closed");
        let converted: PixelwireError = io_err.into();
        match converted {
            PixelwireError::Source { source, .. } => {
                assert_eq!(source.unwrap().to_string(), "port closed");
            }
            other => panic!("expected Source error, got {other:?}"),
        }
    }
}
