//! # Error Types
//!
//! The error taxonomy every key-value store reports through.

use thiserror::Error;

/// Result alias used by all store operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur during key-value store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// Operation issued before `init`, after `deinit`, or on blank media.
    #[error("Store not ready")]
    NotReady,

    /// No live record for the key, or the iterator is exhausted.
    #[error("Item not found")]
    NotFound,

    /// Mutation of a write-once key outside of `reset`.
    #[error("Write protected: key was created with WRITE_ONCE")]
    WriteProtected,

    /// Caller buffer cannot hold the whole item.
    #[error("Buffer too small: need {required} bytes, have {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    /// No room for the record even after garbage collection.
    #[error("Media full: record needs {required} bytes, {available} available")]
    MediaFull { required: usize, available: usize },

    /// Checksum mismatch that no interrupted commit explains.
    #[error("Data corruption: {reason}")]
    Corrupted { reason: String },

    /// Tag or rollback-counter verification failed.
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The block device reported an error.
    #[error("Device I/O error: {message}")]
    DeviceIo { message: String },

    /// Malformed key, path or flag set.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A bounded resource (open iterators) is exhausted.
    #[error("Out of resources: {resource}")]
    OutOfResources { resource: &'static str },
}

impl KvError {
    /// Stable status code for this error class.
    ///
    /// Success is reported as 0 by callers; each error class maps to a
    /// distinct positive code.
    pub fn status_code(&self) -> i32 {
        match self {
            KvError::NotReady => 1,
            KvError::NotFound => 2,
            KvError::WriteProtected => 3,
            KvError::BufferTooSmall { .. } => 4,
            KvError::MediaFull { .. } => 5,
            KvError::Corrupted { .. } => 6,
            KvError::AuthenticationFailed { .. } => 7,
            KvError::DeviceIo { .. } => 8,
            KvError::InvalidArgument { .. } => 9,
            KvError::OutOfResources { .. } => 10,
        }
    }

    pub fn corrupted(reason: impl Into<String>) -> Self {
        KvError::Corrupted {
            reason: reason.into(),
        }
    }

    pub fn auth_failed(reason: impl Into<String>) -> Self {
        KvError::AuthenticationFailed {
            reason: reason.into(),
        }
    }
}

/// Status code of an operation result: 0 on success.
pub fn status_of<T>(result: &KvResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.status_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KvError::BufferTooSmall {
            required: 64,
            provided: 16,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("64"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_status_codes_are_distinct() {
        let errors = [
            KvError::NotReady,
            KvError::NotFound,
            KvError::WriteProtected,
            KvError::BufferTooSmall {
                required: 1,
                provided: 0,
            },
            KvError::MediaFull {
                required: 1,
                available: 0,
            },
            KvError::corrupted("x"),
            KvError::auth_failed("x"),
            KvError::DeviceIo {
                message: "x".into(),
            },
            KvError::InvalidArgument { reason: "x".into() },
            KvError::OutOfResources {
                resource: "iterators",
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(KvError::status_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_status_of() {
        let ok: KvResult<()> = Ok(());
        let err: KvResult<()> = Err(KvError::NotFound);
        assert_eq!(status_of(&ok), 0);
        assert_eq!(status_of(&err), 2);
    }
}
