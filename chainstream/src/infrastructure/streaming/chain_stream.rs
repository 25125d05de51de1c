//! The chained in-memory stream engine.

use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{exclusive::Exclusive, state::StreamState};
use crate::domain::{
    BlockAllocation, BlockChain, BufferPool, ByteStream, Rejected, SeekFrom, StreamConfig,
    StreamConfigError, StreamError, ports::check_copy,
};

/// A growable, seekable byte stream stored in a chain of memory blocks.
///
/// Writing past the end appends blocks of at least the configured minimum
/// size, either heap allocated or rented from a [`BufferPool`]. Existing
/// blocks are never copied to grow the stream, and whole chains can be moved
/// in and out without copying the bytes:
///
/// - [`attach_buffer`](Self::attach_buffer) replaces the content with a chain
/// - [`detach_buffer`](Self::detach_buffer) hands the content to the caller
/// - [`append_buffer`](Self::append_buffer) links a chain after the end
/// - [`inject_buffer_at_current_position`](Self::inject_buffer_at_current_position)
///   splices a chain in at the position, inserting or overwriting
///
/// Every operation takes `&self`. A synchronized stream (see
/// [`StreamConfig::synchronized`]) serializes callers for the duration of each
/// operation; an unsynchronized one reports [`StreamError::Contended`] when
/// used by two callers at once.
///
/// Dropping the stream, or calling [`close`](Self::close), releases every block
/// it still owns.
///
/// # Examples
///
/// ```
/// use chainstream::{ChainStream, SeekFrom};
///
/// let stream = ChainStream::with_block_size(4).unwrap();
/// stream.write(b"hello world").unwrap();
/// assert_eq!(stream.block_count().unwrap(), 3);
///
/// stream.seek(SeekFrom::Start(6)).unwrap();
/// let mut buf = [0u8; 5];
/// assert_eq!(stream.read(&mut buf).unwrap(), 5);
/// assert_eq!(&buf, b"world");
/// ```
pub struct ChainStream {
    state: Exclusive<StreamState>,
    config: StreamConfig,
    closed: AtomicBool,
}

impl Default for ChainStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStream {
    /// Create a seekable stream with the default block size and heap allocation.
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default())
    }

    /// Create a seekable stream with heap-allocated blocks of at least `minimum_block_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `minimum_block_size` is zero.
    pub fn with_block_size(minimum_block_size: usize) -> Result<Self, StreamConfigError> {
        StreamConfig::new(minimum_block_size).map(Self::with_config)
    }

    /// Create a seekable stream renting its blocks from `pool`.
    pub fn with_pool(pool: Arc<dyn BufferPool>) -> Self {
        Self::with_config(StreamConfig::default().pool(pool))
    }

    /// Create a seekable stream renting its blocks from the process-wide default pool.
    pub fn with_default_pool() -> Self {
        Self::with_config(StreamConfig::default().allocation(BlockAllocation::DefaultPool))
    }

    /// Create a stream that only reads and writes sequentially.
    ///
    /// `seek`, `set_length`, `position` and `length` fail with
    /// [`StreamError::NotSupported`].
    pub fn non_seekable() -> Self {
        Self::with_config(StreamConfig::default().seekable(false))
    }

    /// Create a stream from a full configuration.
    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            state: Exclusive::new(StreamState::new(), config.is_synchronized()),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Get the stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Get the minimum capacity of newly allocated blocks.
    pub fn minimum_block_size(&self) -> usize {
        self.config.minimum_block_size()
    }

    /// Whether callers are serialized by the internal lock.
    pub fn is_synchronized(&self) -> bool {
        self.config.is_synchronized()
    }

    /// Whether blocks are released as soon as they have been read.
    pub fn releases_read_blocks(&self) -> bool {
        self.config.releases_read_blocks()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether the stream can be read. False once closed.
    pub fn can_read(&self) -> bool {
        !self.is_closed()
    }

    /// Whether the stream can be written. False once closed.
    pub fn can_write(&self) -> bool {
        !self.is_closed()
    }

    /// Whether the stream supports seeking. False once closed.
    pub fn can_seek(&self) -> bool {
        self.config.is_seekable() && !self.is_closed()
    }

    fn require_seekable(&self) -> Result<(), StreamError> {
        if self.config.is_seekable() {
            Ok(())
        } else {
            Err(StreamError::NotSupported("Stream does not support seeking."))
        }
    }

    /// Total length in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotSupported`] on a non-seekable stream.
    pub fn length(&self) -> Result<u64, StreamError> {
        self.require_seekable()?;
        let state = self.state.lock()?;
        state.ensure_open()?;
        Ok(state.length())
    }

    /// Current position.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotSupported`] on a non-seekable stream.
    pub fn position(&self) -> Result<u64, StreamError> {
        self.require_seekable()?;
        let state = self.state.lock()?;
        state.ensure_open()?;
        Ok(state.position())
    }

    /// Move to an absolute position, which may lie past the end.
    pub fn set_position(&self, position: u64) -> Result<(), StreamError> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    /// Move the position, returning the new absolute position.
    ///
    /// Seeking past the end is allowed; the gap becomes zero bytes on the next
    /// write.
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotSupported`] on a non-seekable stream
    /// - [`StreamError::OutOfRange`] if the target is negative
    /// - [`StreamError::Released`] if the target lies in a region released after reading
    pub fn seek(&self, pos: SeekFrom) -> Result<u64, StreamError> {
        self.require_seekable()?;
        self.state.lock()?.seek(pos)
    }

    /// Truncate or zero-extend the stream to `length` bytes, clamping the position.
    pub fn set_length(&self, length: u64) -> Result<(), StreamError> {
        self.require_seekable()?;
        self.state.lock()?.set_length(length, &self.config)
    }

    /// Read up to `buf.len()` bytes. Returns `0` only at the end of the stream.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.state
            .lock()?
            .read(buf, self.config.releases_read_blocks())
    }

    /// Read one byte, or `None` at the end of the stream.
    pub fn read_byte(&self) -> Result<Option<u8>, StreamError> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Write all of `buf` at the position, growing the stream as needed.
    pub fn write(&self, buf: &[u8]) -> Result<(), StreamError> {
        self.state.lock()?.write(buf, &self.config)
    }

    /// Write one byte at the position.
    pub fn write_byte(&self, value: u8) -> Result<(), StreamError> {
        self.write(&[value])
    }

    /// Nothing is buffered outside the chain, so this only waits for the lock.
    ///
    /// Succeeds on a closed stream.
    pub fn flush(&self) -> Result<(), StreamError> {
        drop(self.state.lock()?);
        Ok(())
    }

    /// Release every block and make the stream unusable. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), StreamError> {
        if self.state.lock()?.close() {
            self.closed.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Asynchronous [`read`](Self::read).
    pub async fn read_async(
        &self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize, StreamError> {
        self.state
            .lock_async(cancel)
            .await?
            .read(buf, self.config.releases_read_blocks())
    }

    /// Asynchronous [`write`](Self::write).
    pub async fn write_async(&self, buf: &[u8], cancel: &CancellationToken) -> Result<(), StreamError> {
        self.state.lock_async(cancel).await?.write(buf, &self.config)
    }

    /// Asynchronous [`flush`](Self::flush).
    pub async fn flush_async(&self, cancel: &CancellationToken) -> Result<(), StreamError> {
        drop(self.state.lock_async(cancel).await?);
        Ok(())
    }

    /// Copy everything from the position to the end into `dest`, `buffer_size`
    /// bytes at a time. Returns the number of bytes copied.
    ///
    /// The lock is taken once per chunk and released before the chunk is
    /// written, so two streams can copy into each other concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidOperation`] if `dest` is this stream.
    pub fn copy_to<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
    ) -> Result<u64, StreamError> {
        check_copy(self, dest, buffer_size)?;
        let remaining = {
            let state = self.state.lock()?;
            state.ensure_open()?;
            state.remaining()
        };

        let mut chunk = vec![0u8; chunk_size(buffer_size, remaining)];
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
    pub async fn copy_to_async<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError> {
        check_copy(self, dest, buffer_size)?;
        let remaining = {
            let state = self.state.lock_async(cancel).await?;
            state.ensure_open()?;
            state.remaining()
        };

        let mut chunk = vec![0u8; chunk_size(buffer_size, remaining)];
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

    /// Replace the stream's content with `chain`, taking ownership of it.
    ///
    /// The position moves to 0 and the length becomes the chain's total
    /// length. The chain owned until now is handed back if it held any blocks.
    ///
    /// # Errors
    ///
    /// On failure the chain is returned untouched inside [`Rejected`].
    pub fn attach_buffer(&self, chain: BlockChain) -> Result<Option<BlockChain>, Rejected> {
        match self.state.lock() {
            Ok(mut state) => state.attach(chain),
            Err(error) => Err(Rejected::new(chain, error)),
        }
    }

    /// Asynchronous [`attach_buffer`](Self::attach_buffer).
    ///
    /// If `cancel` fires while waiting for the lock, the stream is untouched
    /// and the chain comes back inside [`Rejected`].
    pub async fn attach_buffer_async(
        &self,
        chain: BlockChain,
        cancel: &CancellationToken,
    ) -> Result<Option<BlockChain>, Rejected> {
        match self.state.lock_async(cancel).await {
            Ok(mut state) => state.attach(chain),
            Err(error) => Err(Rejected::new(chain, error)),
        }
    }

    /// Take the stream's content out as a chain, leaving the stream empty.
    ///
    /// Returns `None` if the stream held no blocks. The caller owns the chain;
    /// dropping it releases the blocks.
    pub fn detach_buffer(&self) -> Result<Option<BlockChain>, StreamError> {
        self.state.lock()?.detach()
    }

    /// Asynchronous [`detach_buffer`](Self::detach_buffer).
    pub async fn detach_buffer_async(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<BlockChain>, StreamError> {
        self.state.lock_async(cancel).await?.detach()
    }

    /// Link `chain` after the end of the stream. The position does not move.
    pub fn append_buffer(&self, chain: BlockChain) -> Result<(), Rejected> {
        match self.state.lock() {
            Ok(mut state) => state.append(chain),
            Err(error) => Err(Rejected::new(chain, error)),
        }
    }

    /// Asynchronous [`append_buffer`](Self::append_buffer).
    pub async fn append_buffer_async(
        &self,
        chain: BlockChain,
        cancel: &CancellationToken,
    ) -> Result<(), Rejected> {
        match self.state.lock_async(cancel).await {
            Ok(mut state) => state.append(chain),
            Err(error) => Err(Rejected::new(chain, error)),
        }
    }

    /// Splice `chain` into the stream at the current position.
    ///
    /// With `overwrite` false the bytes from the position on move back behind
    /// the chain. With `overwrite` true they are replaced for the chain's
    /// length, and the stream only grows if the chain reaches past the end.
    /// A position beyond the end is zero-filled up to the position first.
    ///
    /// When `advance` is set the position moves past the spliced bytes,
    /// otherwise it stays at their start.
    ///
    /// # Errors
    ///
    /// On failure the chain is returned untouched inside [`Rejected`] and the
    /// stream is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainstream::{ChainStream, SeekFrom};
    /// use chainstream::domain::BlockChain;
    ///
    /// let stream = ChainStream::with_block_size(4).unwrap();
    /// stream.write(b"hello world").unwrap();
    /// stream.seek(SeekFrom::Start(5)).unwrap();
    ///
    /// let chain = BlockChain::from_slice(b", big", 4).unwrap();
    /// stream.inject_buffer_at_current_position(chain, false, true).unwrap();
    ///
    /// assert_eq!(stream.to_vec().unwrap(), b"hello, big world");
    /// assert_eq!(stream.position().unwrap(), 10);
    /// ```
    pub fn inject_buffer_at_current_position(
        &self,
        chain: BlockChain,
        overwrite: bool,
        advance: bool,
    ) -> Result<(), Rejected> {
        match self.state.lock() {
            Ok(mut state) => state.inject(chain, overwrite, advance, &self.config),
            Err(error) => Err(Rejected::new(chain, error)),
        }
    }

    /// Asynchronous [`inject_buffer_at_current_position`](Self::inject_buffer_at_current_position).
    pub async fn inject_buffer_at_current_position_async(
        &self,
        chain: BlockChain,
        overwrite: bool,
        advance: bool,
        cancel: &CancellationToken,
    ) -> Result<(), Rejected> {
        match self.state.lock_async(cancel).await {
            Ok(mut state) => state.inject(chain, overwrite, advance, &self.config),
            Err(error) => Err(Rejected::new(chain, error)),
        }
    }

    /// Copy the stream's content into one vector, regardless of the position.
    ///
    /// Bytes already released after reading are not included.
    pub fn to_vec(&self) -> Result<Vec<u8>, StreamError> {
        let state = self.state.lock()?;
        state.ensure_open()?;
        Ok(state.to_vec())
    }

    /// Number of blocks currently owned by the stream.
    pub fn block_count(&self) -> Result<usize, StreamError> {
        let state = self.state.lock()?;
        state.ensure_open()?;
        Ok(state.block_count())
    }
}

fn chunk_size(buffer_size: usize, remaining: u64) -> usize {
    usize::try_from(remaining)
        .map_or(buffer_size, |remaining| buffer_size.min(remaining))
        .max(1)
}

impl fmt::Debug for ChainStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainStream")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl ByteStream for ChainStream {
    fn can_read(&self) -> bool {
        ChainStream::can_read(self)
    }

    fn can_write(&self) -> bool {
        ChainStream::can_write(self)
    }

    fn can_seek(&self) -> bool {
        ChainStream::can_seek(self)
    }

    fn length(&self) -> Result<u64, StreamError> {
        ChainStream::length(self)
    }

    fn position(&self) -> Result<u64, StreamError> {
        ChainStream::position(self)
    }

    fn set_position(&self, position: u64) -> Result<(), StreamError> {
        ChainStream::set_position(self, position)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        ChainStream::read(self, buf)
    }

    fn read_byte(&self) -> Result<Option<u8>, StreamError> {
        ChainStream::read_byte(self)
    }

    fn write(&self, buf: &[u8]) -> Result<(), StreamError> {
        ChainStream::write(self, buf)
    }

    fn write_byte(&self, value: u8) -> Result<(), StreamError> {
        ChainStream::write_byte(self, value)
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, StreamError> {
        ChainStream::seek(self, pos)
    }

    fn set_length(&self, length: u64) -> Result<(), StreamError> {
        ChainStream::set_length(self, length)
    }

    fn flush(&self) -> Result<(), StreamError> {
        ChainStream::flush(self)
    }

    fn close(&self) -> Result<(), StreamError> {
        ChainStream::close(self)
    }

    async fn read_async(
        &self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize, StreamError> {
        ChainStream::read_async(self, buf, cancel).await
    }

    async fn write_async(&self, buf: &[u8], cancel: &CancellationToken) -> Result<(), StreamError> {
        ChainStream::write_async(self, buf, cancel).await
    }

    async fn flush_async(&self, cancel: &CancellationToken) -> Result<(), StreamError> {
        ChainStream::flush_async(self, cancel).await
    }

    fn copy_to<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
    ) -> Result<u64, StreamError> {
        ChainStream::copy_to(self, dest, buffer_size)
    }

    async fn copy_to_async<D: ByteStream + ?Sized>(
        &self,
        dest: &D,
        buffer_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError> {
        ChainStream::copy_to_async(self, dest, buffer_size, cancel).await
    }
}
