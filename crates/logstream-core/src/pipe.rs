//! Copy helpers between Tokio I/O and streams.
//!
//! `copy_in` feeds a producer's output into a stream one line at a time;
//! `copy_out` tails a stream into a writer until end-of-stream.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::StreamError;
use crate::stream::Stream;

/// Initial read buffer size for [`copy_out`].
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Copy every line of `reader` into `stream` until EOF. Returns the number of
/// bytes read.
///
/// Does not close the stream.
pub async fn copy_in<R>(reader: &mut R, stream: &Stream) -> Result<u64, StreamError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut total = 0u64;
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }
        stream.write(&line).await?;
        total += n as u64;
    }
    debug!(stream = %stream.name(), bytes = total, "input drained");
    Ok(total)
}

/// Tail `stream` into `writer` until the close sentinel. Returns the number of
/// bytes written.
///
/// The buffer grows when a pending record is larger than it, so oversized
/// lines never stall the copy.
pub async fn copy_out<W>(stream: &mut Stream, writer: &mut W) -> Result<u64, StreamError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; DEFAULT_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let outcome = stream.read(&mut buf).await?;
        let n = outcome.bytes();
        if n > 0 {
            writer.write_all(&buf[..n]).await?;
            writer.flush().await?;
            total += n as u64;
        }
        if outcome.is_eof() {
            break;
        }
        if let Some(pending) = stream.pending_len() {
            if pending > buf.len() {
                buf.resize(pending, 0);
            }
        }
    }
    writer.flush().await?;
    Ok(total)
}
