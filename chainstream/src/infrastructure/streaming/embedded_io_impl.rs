//! Implementations of embedded_io_async traits for the streams.
//!
//! These bridge [`ChainStream`] and [`ReadOnlyStream`] to the embedded_io_async
//! ecosystem. The trait methods cannot carry a cancellation token, so they
//! wait for the lock without one.

use embedded_io_async::{ErrorType, Read, Seek, Write};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ByteStream, StreamError},
    infrastructure::streaming::{ChainStream, ReadOnlyStream},
};

impl ErrorType for ChainStream {
    type Error = StreamError;
}

impl Read for ChainStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        ChainStream::read_async(self, buf, &CancellationToken::new()).await
    }
}

impl Write for ChainStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        ChainStream::write_async(self, buf, &CancellationToken::new()).await?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        ChainStream::flush_async(self, &CancellationToken::new()).await
    }
}

impl Seek for ChainStream {
    async fn seek(&mut self, pos: embedded_io_async::SeekFrom) -> Result<u64, Self::Error> {
        ChainStream::seek(self, pos.into())
    }
}

// Shared references go through the stream's own lock.
impl ErrorType for &ChainStream {
    type Error = StreamError;
}

impl Read for &ChainStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        ChainStream::read_async(self, buf, &CancellationToken::new()).await
    }
}

impl Write for &ChainStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        ChainStream::write_async(self, buf, &CancellationToken::new()).await?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        ChainStream::flush_async(self, &CancellationToken::new()).await
    }
}

impl Seek for &ChainStream {
    async fn seek(&mut self, pos: embedded_io_async::SeekFrom) -> Result<u64, Self::Error> {
        ChainStream::seek(self, pos.into())
    }
}

impl<S: ByteStream> ErrorType for ReadOnlyStream<S> {
    type Error = StreamError;
}

impl<S: ByteStream> Read for ReadOnlyStream<S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_async(buf, &CancellationToken::new()).await
    }
}

impl<S: ByteStream> Seek for ReadOnlyStream<S> {
    async fn seek(&mut self, pos: embedded_io_async::SeekFrom) -> Result<u64, Self::Error> {
        <Self as ByteStream>::seek(self, pos.into())
    }
}
