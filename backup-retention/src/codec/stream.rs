//! Stream filters applying a selected compression backend.
//!
//! The tar layer itself is written and read by the archive pipeline; these
//! filters only wrap its byte stream.

use super::{CompressedArchive, Compression};
use crate::utils::errors::CodecError;
use async_compression::tokio::bufread::{
    BrotliDecoder, BrotliEncoder, BzDecoder, BzEncoder, GzipDecoder, GzipEncoder, Lz4Decoder,
    Lz4Encoder, XzDecoder, XzEncoder, ZstdDecoder, ZstdEncoder,
};
use async_compression::Level;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufRead, AsyncRead, DuplexStream, ReadBuf};
use tokio::task::JoinHandle;
use tokio_util::io::SyncIoBridge;

/// Byte stream produced by a filter.
pub type ArchiveStream = Pin<Box<dyn AsyncRead>>;

/// Buffer between a blocking codec and the async reader of its output.
const PIPE_CAPACITY: usize = 256 * 1024;

fn quality(level: Option<i32>) -> Level {
    level.map(Level::Precise).unwrap_or(Level::Default)
}

impl Compression {
    /// Compress everything read from `reader`.
    pub async fn encode<R>(&self, reader: R) -> Result<ArchiveStream, CodecError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let stream: ArchiveStream = match *self {
            Compression::Lz4 { level } => Box::pin(Lz4Encoder::with_quality(reader, quality(level))),
            Compression::Bzip2 { level } => Box::pin(BzEncoder::with_quality(reader, quality(level))),
            Compression::Gzip { level, .. } => {
                Box::pin(GzipEncoder::with_quality(reader, quality(level)))
            }
            Compression::Snappy => Box::pin(BlockingFilter::spawn(reader, |source, sink| {
                let mut encoder = snap::write::FrameEncoder::new(sink);
                io::copy(source, &mut encoder)?;
                let sink = encoder
                    .into_inner()
                    .map_err(|_| io::Error::other("snappy encoder flush failed"))?;
                sink.shutdown()
            })),
            Compression::Xz => Box::pin(XzEncoder::new(reader)),
            Compression::Brotli { quality: q } => {
                Box::pin(BrotliEncoder::with_quality(reader, quality(q)))
            }
            Compression::Zstd { level } => Box::pin(ZstdEncoder::with_quality(reader, quality(level))),
        };
        Ok(stream)
    }

    /// Decompress everything read from `reader`.
    pub async fn decode<R>(&self, reader: R) -> Result<ArchiveStream, CodecError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let stream: ArchiveStream = match *self {
            Compression::Lz4 { .. } => Box::pin(Lz4Decoder::new(reader)),
            Compression::Bzip2 { .. } => Box::pin(BzDecoder::new(reader)),
            Compression::Gzip { .. } => {
                let mut decoder = GzipDecoder::new(reader);
                decoder.multiple_members(true);
                Box::pin(decoder)
            }
            Compression::Snappy => Box::pin(BlockingFilter::spawn(reader, |source, sink| {
                let mut decoder = snap::read::FrameDecoder::new(source);
                io::copy(&mut decoder, sink)?;
                sink.shutdown()
            })),
            Compression::Xz => Box::pin(XzDecoder::new(reader)),
            Compression::Brotli { .. } => Box::pin(BrotliDecoder::new(reader)),
            Compression::Zstd { .. } => Box::pin(ZstdDecoder::new(reader)),
        };
        Ok(stream)
    }
}

impl CompressedArchive {
    /// Wrap a tar stream for writing. Plain tar passes through unchanged.
    pub async fn compress<R>(&self, reader: R) -> Result<ArchiveStream, CodecError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        match &self.compression {
            Some(compression) => compression.encode(reader).await,
            None => Ok(Box::pin(reader)),
        }
    }

    /// Unwrap a stored archive back into its tar stream.
    pub async fn decompress<R>(&self, reader: R) -> Result<ArchiveStream, CodecError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        match &self.compression {
            Some(compression) => compression.decode(reader).await,
            None => Ok(Box::pin(reader)),
        }
    }
}

/// Runs a synchronous codec on the blocking pool and exposes its output as an
/// async stream.
///
/// The codec writes into one end of a bounded pipe, so memory stays at
/// `PIPE_CAPACITY` no matter how large the archive is. A codec failure is
/// reported to the reader once the pipe drains, instead of a silent short stream.
struct BlockingFilter {
    output: DuplexStream,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl BlockingFilter {
    /// Must be called from within a tokio runtime.
    fn spawn<R, F>(reader: R, codec: F) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        F: FnOnce(&mut SyncIoBridge<R>, &mut SyncIoBridge<DuplexStream>) -> io::Result<()>
            + Send
            + 'static,
    {
        let (input, output) = tokio::io::duplex(PIPE_CAPACITY);
        let mut source = SyncIoBridge::new(reader);
        let mut sink = SyncIoBridge::new(input);
        let task = tokio::task::spawn_blocking(move || codec(&mut source, &mut sink));
        Self {
            output,
            task: Some(task),
        }
    }
}

impl AsyncRead for BlockingFilter {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let filled = buf.filled().len();
        match Pin::new(&mut self.output).poll_read(cx, buf) {
            Poll::Ready(Ok(())) if buf.filled().len() == filled && buf.remaining() > 0 => {}
            other => return other,
        }

        // Pipe closed: the codec finished or gave up.
        let Some(task) = self.task.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let result = match Pin::new(task).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(result)) => result,
            Poll::Ready(Err(e)) => Err(io::Error::other(e)),
        };
        self.task = None;
        Poll::Ready(result)
    }
}
