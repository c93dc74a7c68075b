//! Error types for fogger-core.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from image buffer construction and access.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel buffer length does not match the declared dimensions.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Bytes required by width * height * channels
        expected: usize,
        /// Bytes actually supplied
        actual: usize,
    },

    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_mismatch_message() {
        let err = Error::BufferSizeMismatch {
            expected: 64,
            actual: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("64"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_invalid_dimensions_message() {
        let err = Error::InvalidDimensions {
            width: 0,
            height: 480,
        };
        assert!(err.to_string().contains("0x480"));
    }
}
