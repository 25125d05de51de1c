//! Domain-level errors.
//!
//! Every fallible operation in the crate reports a [`StreamError`]. Operations
//! that take ownership of a caller's [`BlockChain`] report a [`Rejected`]
//! instead, which hands the untouched chain back together with the cause.

use core::fmt;

use crate::domain::BlockChain;

/// Errors that can occur while operating on blocks, chains and streams.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamError {
    /// A size, length or position argument is outside its valid range.
    OutOfRange {
        /// Name of the offending argument.
        what: &'static str,
        /// The rejected value.
        value: i128,
    },

    /// The operation is not supported by this stream's capabilities
    /// (seeking a non-seekable stream, writing through a read-only view).
    NotSupported(&'static str),

    /// The operation conflicts with the current state of the stream.
    InvalidOperation(&'static str),

    /// A buffer of the requested size could not be allocated or rented.
    OutOfMemory {
        /// The number of bytes that was requested.
        requested: usize,
    },

    /// The operation was cancelled before it started executing.
    Cancelled,

    /// The stream has been closed.
    Disposed,

    /// The requested offset lies in a region whose blocks were already
    /// released after being read.
    Released {
        /// The offset that was requested.
        offset: u64,
        /// First offset that is still backed by a block.
        available_from: u64,
    },

    /// An unsynchronized stream was used from more than one caller at once.
    Contended,
}

impl StreamError {
    pub(crate) fn out_of_range(what: &'static str, value: i128) -> Self {
        Self::OutOfRange { what, value }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { what, value } => {
                write!(f, "Argument '{}' is out of range: {}", what, value)
            }
            Self::NotSupported(msg) => write!(f, "Operation not supported: {}", msg),
            Self::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Self::OutOfMemory { requested } => {
                write!(f, "Unable to allocate a buffer of {} bytes", requested)
            }
            Self::Cancelled => write!(f, "Operation was cancelled"),
            Self::Disposed => write!(f, "Cannot access a closed stream"),
            Self::Released {
                offset,
                available_from,
            } => write!(
                f,
                "Offset {} was already released; data is available from offset {}",
                offset, available_from
            ),
            Self::Contended => write!(
                f,
                "Stream is already in use; enable synchronization to share it between callers"
            ),
        }
    }
}

impl core::error::Error for StreamError {}

impl embedded_io_async::Error for StreamError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        use embedded_io_async::ErrorKind;

        match self {
            Self::OutOfRange { .. } | Self::Released { .. } => ErrorKind::InvalidInput,
            Self::NotSupported(_) => ErrorKind::Unsupported,
            Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::Cancelled => ErrorKind::Interrupted,
            Self::InvalidOperation(_) | Self::Disposed | Self::Contended => ErrorKind::Other,
        }
    }
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            StreamError::OutOfRange { .. } | StreamError::Released { .. } => {
                ErrorKind::InvalidInput
            }
            StreamError::NotSupported(_) => ErrorKind::Unsupported,
            StreamError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            StreamError::Cancelled => ErrorKind::Interrupted,
            StreamError::Contended => ErrorKind::WouldBlock,
            StreamError::InvalidOperation(_) | StreamError::Disposed => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// A chain-transfer operation that did not take ownership of the chain.
///
/// The chain is returned exactly as it was passed in, unlinked from any
/// stream, so the caller can retry, reuse or release it.
#[derive(Debug)]
pub struct Rejected {
    /// The chain the caller passed in.
    pub chain: BlockChain,
    /// Why the operation was rejected.
    pub error: StreamError,
}

impl Rejected {
    pub(crate) fn new(chain: BlockChain, error: StreamError) -> Self {
        Self { chain, error }
    }

    /// Consume the rejection, returning the caller's chain.
    pub fn into_chain(self) -> BlockChain {
        self.chain
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain of {} bytes rejected: {}",
            self.chain.total_length(),
            self.error
        )
    }
}

impl core::error::Error for Rejected {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.error)
    }
}

// Dropping the chain here hands its buffers back to their origin.
impl From<Rejected> for StreamError {
    fn from(rejected: Rejected) -> Self {
        rejected.error
    }
}
