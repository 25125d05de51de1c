//! Seek origin value object.

/// Seek position for stream operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Offset from the start of the stream.
    Start(u64),
    /// Offset relative to the current position.
    Current(i64),
    /// Offset from the end of the stream.
    End(i64),
}

impl SeekFrom {
    /// Resolve against the given position and length.
    ///
    /// Returns `None` when the target would be negative or overflow.
    pub fn resolve(self, position: u64, length: u64) -> Option<u64> {
        u64::try_from(self.target(position, length)).ok()
    }

    /// The unclamped absolute target, which may be negative.
    pub(crate) fn target(self, position: u64, length: u64) -> i128 {
        match self {
            Self::Start(offset) => i128::from(offset),
            Self::Current(offset) => i128::from(position) + i128::from(offset),
            Self::End(offset) => i128::from(length) + i128::from(offset),
        }
    }
}

impl From<embedded_io_async::SeekFrom> for SeekFrom {
    fn from(from: embedded_io_async::SeekFrom) -> Self {
        match from {
            embedded_io_async::SeekFrom::Start(n) => Self::Start(n),
            embedded_io_async::SeekFrom::End(n) => Self::End(n),
            embedded_io_async::SeekFrom::Current(n) => Self::Current(n),
        }
    }
}

impl From<std::io::SeekFrom> for SeekFrom {
    fn from(from: std::io::SeekFrom) -> Self {
        match from {
            std::io::SeekFrom::Start(n) => Self::Start(n),
            std::io::SeekFrom::End(n) => Self::End(n),
            std::io::SeekFrom::Current(n) => Self::Current(n),
        }
    }
}
