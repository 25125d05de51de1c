//! ByteStream port - the stream contract shared by every stream in the crate.

use core::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::{SeekFrom, StreamError};

/// Default chunk size used by [`ByteStream::copy_to`] callers that have no
/// better estimate.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 81_920;

/// Port for a seekable, readable and writable byte stream.
///
/// Every operation takes `&self`: implementations serialize access internally,
/// which lets a stream be shared between tasks when its configuration allows it.
/// Capability queries (`can_read`, `can_write`, `can_seek`) describe which of the
/// remaining operations may succeed; unsupported ones fail with
/// [`StreamError::NotSupported`].
///
/// The asynchronous operations accept a [`CancellationToken`]. A token that is
/// already cancelled makes the call fail with [`StreamError::Cancelled`] before
/// anything else happens.
#[allow(async_fn_in_trait)]
pub trait ByteStream {
    /// Whether [`read`](Self::read) is supported.
    fn can_read(&self) -> bool;

    /// Whether the write family ([`write`](Self::write), [`set_length`](Self::set_length), ...) is supported.
    fn can_write(&self) -> bool;

    /// Whether [`seek`](Self::seek), [`position`](Self::position) and [`length`](Self::length) are supported.
    fn can_seek(&self) -> bool;

    /// Whether the stream honours read/write timeouts.
    fn can_timeout(&self) -> bool {
        false
    }

    /// The read timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidOperation`] unless the stream supports timeouts.
    fn read_timeout(&self) -> Result<Duration, StreamError> {
        Err(StreamError::InvalidOperation(
            "Timeouts are not supported on this stream.",
        ))
    }

    /// The write timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidOperation`] unless the stream supports timeouts.
    fn write_timeout(&self) -> Result<Duration, StreamError> {
        Err(StreamError::InvalidOperation(
            "Timeouts are not supported on this stream.",
        ))
    }

    /// Total length of the stream in bytes.
    fn length(&self) -> Result<u64, StreamError>;

    /// Current position from the start of the stream.
    fn position(&self) -> Result<u64, StreamError>;

    /// Move to an absolute position.
    fn set_position(&self, position: u64) -> Result<(), StreamError>;

    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// Returns `0` only at the end of the stream.
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// Read a single byte, or `None` at the end of the stream.
    fn read_byte(&self) -> Result<Option<u8>, StreamError> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Write the whole of `buf` at the current position.
    fn write(&self, buf: &[u8]) -> Result<(), StreamError>;

    /// Write a single byte at the current position.
    fn write_byte(&self, value: u8) -> Result<(), StreamError> {
        self.write(&[value])
    }

    /// Move the position, returning the new absolute position.
    fn seek(&self, pos: SeekFrom) -> Result<u64, StreamError>;

    /// Truncate or extend the stream to `length` bytes.
    fn set_length(&self, length: u64) -> Result<(), StreamError>;

    /// Flush buffered data to the backing store.
    fn flush(&self) -> Result<(), StreamError>;

    /// Release every resource held by the stream. Closing twice is a no-op.
    fn close(&self) -> Result<(), StreamError>;

    /// Asynchronous [`read`](Self::read).
    async fn read_async(
        &self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize, StreamError>;

    /// Asynchronous [`write`](Self::write).
    async fn write_async(&self, buf: &[u8], cancel: &CancellationToken)
    -> Result<(), StreamError>;

    /// Asynchronous [`flush`](Self::flush).
    async fn flush_async(&self, cancel: &CancellationToken) -> Result<(), StreamError>;

    /// Copy everything from the current position to the end into `dest`,
    /// `buffer_size` bytes at a time. Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfRange`] if `buffer_size` is zero,
    /// [`StreamError::InvalidOperation`] if `dest` is the source itself and
    /// [`StreamError::NotSupported`] if either side lacks the capability.
    fn copy_to<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
    ) -> Result<u64, StreamError> {
        check_copy(self, dest, buffer_size)?;

        let mut chunk = vec![0u8; buffer_size];
        let mut copied = 0u64;
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                return Ok(copied);
            }
            dest.write(&chunk[..n])?;
            copied += n as u64;
        }
    }

    /// Asynchronous [`copy_to`](Self::copy_to).
    async fn copy_to_async<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError> {
        check_copy(self, dest, buffer_size)?;

        let mut chunk = vec![0u8; buffer_size];
        let mut copied = 0u64;
        loop {
            let n = self.read_async(&mut chunk, cancel).await?;
            if n == 0 {
                return Ok(copied);
            }
            dest.write_async(&chunk[..n], cancel).await?;
            copied += n as u64;
        }
    }
}

pub(crate) fn check_copy<S, D>(source: &S, dest: &D, buffer_size: usize) -> Result<(), StreamError>
where
    S: ByteStream + ?Sized,
    D: ByteStream + ?Sized,
{
    if buffer_size == 0 {
        return Err(StreamError::out_of_range("buffer_size", 0));
    }
    if core::ptr::addr_eq(source, dest) {
        return Err(StreamError::InvalidOperation(
            "Cannot copy a stream into itself.",
        ));
    }
    if !source.can_read() {
        return Err(StreamError::NotSupported("Source stream does not support reading."));
    }
    if !dest.can_write() {
        return Err(StreamError::NotSupported(
            "Destination stream does not support writing.",
        ));
    }
    Ok(())
}

impl<T: ByteStream + ?Sized> ByteStream for &T {
    fn can_read(&self) -> bool {
        (**self).can_read()
    }

    fn can_write(&self) -> bool {
        (**self).can_write()
    }

    fn can_seek(&self) -> bool {
        (**self).can_seek()
    }

    fn can_timeout(&self) -> bool {
        (**self).can_timeout()
    }

    fn read_timeout(&self) -> Result<Duration, StreamError> {
        (**self).read_timeout()
    }

    fn write_timeout(&self) -> Result<Duration, StreamError> {
        (**self).write_timeout()
    }

    fn length(&self) -> Result<u64, StreamError> {
        (**self).length()
    }

    fn position(&self) -> Result<u64, StreamError> {
        (**self).position()
    }

    fn set_position(&self, position: u64) -> Result<(), StreamError> {
        (**self).set_position(position)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        (**self).read(buf)
    }

    fn read_byte(&self) -> Result<Option<u8>, StreamError> {
        (**self).read_byte()
    }

    fn write(&self, buf: &[u8]) -> Result<(), StreamError> {
        (**self).write(buf)
    }

    fn write_byte(&self, value: u8) -> Result<(), StreamError> {
        (**self).write_byte(value)
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, StreamError> {
        (**self).seek(pos)
    }

    fn set_length(&self, length: u64) -> Result<(), StreamError> {
        (**self).set_length(length)
    }

    fn flush(&self) -> Result<(), StreamError> {
        (**self).flush()
    }

    fn close(&self) -> Result<(), StreamError> {
        (**self).close()
    }

    async fn read_async(
        &self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize, StreamError> {
        (**self).read_async(buf, cancel).await
    }

    async fn write_async(
        &self,
        buf: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), StreamError> {
        (**self).write_async(buf, cancel).await
    }

    async fn flush_async(&self, cancel: &CancellationToken) -> Result<(), StreamError> {
        (**self).flush_async(cancel).await
    }

    fn copy_to<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
    ) -> Result<u64, StreamError> {
        (**self).copy_to(dest, buffer_size)
    }

    async fn copy_to_async<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError> {
        (**self).copy_to_async(dest, buffer_size, cancel).await
    }
}
