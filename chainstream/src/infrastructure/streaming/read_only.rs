//! Read-only view over any [`ByteStream`].

use core::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::{ByteStream, SeekFrom, StreamError};

const WRITE_NOT_SUPPORTED: &str = "Stream does not support writing.";

/// Wraps a stream and rejects every write.
///
/// Reads, seeks, flushes and copies go to the wrapped stream. Writes,
/// [`set_length`](ByteStream::set_length) and write timeouts fail without
/// reaching it, and [`can_write`](ByteStream::can_write) is always false.
/// Closing the view closes the wrapped stream.
///
/// # Examples
///
/// ```
/// use chainstream::{ByteStream, ChainStream, ReadOnlyStream, StreamError};
///
/// let stream = ChainStream::new();
/// stream.write(b"fixed").unwrap();
/// stream.set_position(0).unwrap();
///
/// let view = ReadOnlyStream::new(&stream);
/// assert!(!view.can_write());
/// assert!(matches!(view.write(b"x"), Err(StreamError::NotSupported(_))));
///
/// let mut buf = [0u8; 5];
/// assert_eq!(view.read(&mut buf).unwrap(), 5);
/// assert_eq!(&buf, b"fixed");
/// ```
#[derive(Debug)]
pub struct ReadOnlyStream<S> {
    inner: S,
}

impl<S: ByteStream> ReadOnlyStream<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap, returning the wrapped stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteStream> ByteStream for ReadOnlyStream<S> {
    fn can_read(&self) -> bool {
        self.inner.can_read()
    }

    fn can_write(&self) -> bool {
        false
    }

    fn can_seek(&self) -> bool {
        self.inner.can_seek()
    }

    fn can_timeout(&self) -> bool {
        self.inner.can_timeout()
    }

    fn read_timeout(&self) -> Result<Duration, StreamError> {
        if self.inner.can_read() && self.inner.can_timeout() {
            self.inner.read_timeout()
        } else {
            Err(StreamError::InvalidOperation(
                "Read timeouts are not supported on this stream.",
            ))
        }
    }

    fn write_timeout(&self) -> Result<Duration, StreamError> {
        Err(StreamError::InvalidOperation(
            "Write timeouts are not supported on a read-only stream.",
        ))
    }

    fn length(&self) -> Result<u64, StreamError> {
        self.inner.length()
    }

    fn position(&self) -> Result<u64, StreamError> {
        self.inner.position()
    }

    fn set_position(&self, position: u64) -> Result<(), StreamError> {
        if self.inner.can_seek() {
            self.inner.set_position(position)
        } else {
            Err(StreamError::NotSupported("Stream does not support seeking."))
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.inner.read(buf)
    }

    fn read_byte(&self) -> Result<Option<u8>, StreamError> {
        self.inner.read_byte()
    }

    fn write(&self, _buf: &[u8]) -> Result<(), StreamError> {
        Err(StreamError::NotSupported(WRITE_NOT_SUPPORTED))
    }

    fn write_byte(&self, _value: u8) -> Result<(), StreamError> {
        Err(StreamError::NotSupported(WRITE_NOT_SUPPORTED))
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, StreamError> {
        self.inner.seek(pos)
    }

    fn set_length(&self, _length: u64) -> Result<(), StreamError> {
        Err(StreamError::NotSupported(WRITE_NOT_SUPPORTED))
    }

    fn flush(&self) -> Result<(), StreamError> {
        self.inner.flush()
    }

    fn close(&self) -> Result<(), StreamError> {
        self.inner.close()
    }

    async fn read_async(
        &self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize, StreamError> {
        self.inner.read_async(buf, cancel).await
    }

    async fn write_async(
        &self,
        _buf: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), StreamError> {
        Err(StreamError::NotSupported(WRITE_NOT_SUPPORTED))
    }

    async fn flush_async(&self, cancel: &CancellationToken) -> Result<(), StreamError> {
        self.inner.flush_async(cancel).await
    }

    fn copy_to<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
    ) -> Result<u64, StreamError> {
        self.inner.copy_to(dest, buffer_size)
    }

    async fn copy_to_async<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError> {
        self.inner.copy_to_async(dest, buffer_size, cancel).await
    }
}
