//! Copying a child's output stream to one of ours.

use std::io::{self, Read, Write};
use tracing::debug;

/// Byte counts for one forwarded stream.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub(super) struct ForwardStats {
    pub(super) bytes_read: u64,
    pub(super) bytes_written: u64,
    pub(super) write_failed: bool,
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    read: u64,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.read = self.read.saturating_add(count as u64);
        Ok(count)
    }
}

/// Copy `reader` into `writer` until EOF.
///
/// When the writer fails, for example because our stdout was closed, the
/// remaining input is drained so the child never blocks on a full pipe.
pub(super) fn forward_child_output<R, W>(mut reader: R, mut writer: W, stream_name: &str) -> ForwardStats
where
    R: Read,
    W: Write,
{
    let mut counting = CountingReader {
        inner: &mut reader,
        read: 0,
    };
    let mut stats = ForwardStats::default();
    match io::copy(&mut counting, &mut writer) {
        Ok(written) => stats.bytes_written = written,
        Err(err) => {
            stats.write_failed = true;
            debug!("Failed to write child {stream_name} output: {err}; discarding remaining bytes");
            if let Err(drain_err) = io::copy(&mut counting, &mut io::sink()) {
                debug!("Failed to drain child {stream_name} output: {drain_err}");
            }
        }
    }
    stats.bytes_read = counting.read;
    stats
}
