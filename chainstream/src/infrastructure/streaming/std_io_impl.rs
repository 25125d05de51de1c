//! `std::io` bridges for the streams.

use std::io;

use crate::{
    domain::ByteStream,
    infrastructure::streaming::{ChainStream, ReadOnlyStream},
};

impl io::Read for ChainStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChainStream::read(self, buf)?)
    }
}

impl io::Write for ChainStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChainStream::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(ChainStream::flush(self)?)
    }
}

impl io::Seek for ChainStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(ChainStream::seek(self, pos.into())?)
    }
}

impl io::Read for &ChainStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChainStream::read(self, buf)?)
    }
}

impl io::Write for &ChainStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChainStream::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(ChainStream::flush(self)?)
    }
}

impl io::Seek for &ChainStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(ChainStream::seek(self, pos.into())?)
    }
}

impl<S: ByteStream> io::Read for ReadOnlyStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(<Self as ByteStream>::read(self, buf)?)
    }
}

impl<S: ByteStream> io::Seek for ReadOnlyStream<S> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(<Self as ByteStream>::seek(self, pos.into())?)
    }
}
