//! Literal streaming.
//!
//! A literal is announced with `{N}` at the end of a line and followed by
//! exactly `N` raw bytes. The bytes are read in blocks of the configured size
//! and handed to the sink as they arrive, so the whole literal is never held
//! in memory.

use crate::connection::{Connection, MAX_LINE_LENGTH, MAX_LITERAL_SIZE};
use crate::sink::ResponseSink;
use crate::types::CorrelationId;
use crate::{Error, Result};

/// Progress of a literal being drained from the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LiteralProgress {
    pub total: u64,
    pub read: u64,
}

impl LiteralProgress {
    pub(crate) const fn new(total: u64) -> Self {
        Self { total, read: 0 }
    }

    pub(crate) const fn remaining(&self) -> u64 {
        self.total - self.read
    }

    pub(crate) const fn is_done(&self) -> bool {
        self.read >= self.total
    }
}

/// Rejects literals larger than [`MAX_LITERAL_SIZE`].
pub(crate) fn check_size(total: u64) -> Result<()> {
    if total > MAX_LITERAL_SIZE {
        return Err(Error::Protocol(format!(
            "literal of {total} bytes exceeds limit of {MAX_LITERAL_SIZE}"
        )));
    }
    Ok(())
}

/// Fills `buf` completely from the connection.
fn read_block(conn: &mut dyn Connection, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        filled += conn.read_bytes(&mut buf[filled..])?;
    }
    Ok(())
}

/// Streams a `total`-byte literal to [`ResponseSink::on_fetch_body`].
///
/// When `scan_headers` is set, header fields found in the data are also
/// reported through [`ResponseSink::on_fetch_header`].
pub(crate) fn stream_body(
    conn: &mut dyn Connection,
    sink: &mut dyn ResponseSink,
    id: CorrelationId,
    item: &str,
    total: u64,
    block_size: usize,
    scan_headers: bool,
) -> Result<()> {
    check_size(total)?;
    let mut scanner = scan_headers.then(HeaderScanner::default);

    if total == 0 {
        return sink.on_fetch_body(id, item, &[], 0, 0);
    }

    let block = usize::try_from(total).map_or(block_size, |t| t.min(block_size)).max(1);
    let mut buf = vec![0u8; block];
    let mut progress = LiteralProgress::new(total);

    while !progress.is_done() {
        let want = usize::try_from(progress.remaining()).map_or(block, |r| r.min(block));
        let chunk = &mut buf[..want];
        read_block(conn, chunk)?;
        progress.read += want as u64;

        sink.on_fetch_body(id, item, chunk, progress.read, progress.total)?;
        if let Some(scanner) = scanner.as_mut() {
            scanner.feed(chunk, &mut |name: &str, value: &str| {
                sink.on_fetch_header(id, name, value)
            })?;
        }
    }

    if let Some(mut scanner) = scanner {
        scanner.finish(&mut |name: &str, value: &str| {
            sink.on_fetch_header(id, name, value)
        })?;
    }
    Ok(())
}

/// Reads a small literal into memory, e.g. a mailbox name or envelope field.
pub(crate) fn read_small(conn: &mut dyn Connection, total: u64) -> Result<String> {
    check_size(total)?;
    let len = usize::try_from(total)
        .map_err(|_| Error::Protocol(format!("literal of {total} bytes is too large")))?;
    let data = conn.read_literal(len)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Reads and discards a literal.
pub(crate) fn skip(conn: &mut dyn Connection, total: u64, block_size: usize) -> Result<()> {
    check_size(total)?;
    let block = usize::try_from(total).map_or(block_size, |t| t.min(block_size)).max(1);
    let mut buf = vec![0u8; block];
    let mut progress = LiteralProgress::new(total);
    while !progress.is_done() {
        let want = usize::try_from(progress.remaining()).map_or(block, |r| r.min(block));
        read_block(conn, &mut buf[..want])?;
        progress.read += want as u64;
    }
    Ok(())
}

type EmitHeader<'a> = dyn FnMut(&str, &str) -> Result<()> + 'a;

/// Incremental RFC 5322 header scanner.
///
/// Bytes are fed in arbitrary chunks. A line split across chunks is kept in
/// a residual buffer until its terminator arrives, and folded continuation
/// lines are joined to the field they continue. Scanning stops at the first
/// empty line, which ends the header block.
#[derive(Debug, Default)]
pub(crate) struct HeaderScanner {
    residual: Vec<u8>,
    pending: Option<(String, String)>,
    done: bool,
}

impl HeaderScanner {
    /// Feeds the next chunk of literal data.
    pub(crate) fn feed(&mut self, chunk: &[u8], emit: &mut EmitHeader<'_>) -> Result<()> {
        let mut rest = chunk;
        while !self.done {
            let Some(pos) = rest.iter().position(|&b| b == b'\n') else {
                self.residual.extend_from_slice(rest);
                if self.residual.len() > MAX_LINE_LENGTH {
                    tracing::debug!(len = self.residual.len(), "header line too long, scan stopped");
                    self.residual = Vec::new();
                    self.done = true;
                    self.flush(emit)?;
                }
                break;
            };
            self.residual.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let mut line = std::mem::take(&mut self.residual);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.line(&line, emit)?;
        }
        Ok(())
    }

    /// Flushes a trailing unterminated line and the last pending field.
    pub(crate) fn finish(&mut self, emit: &mut EmitHeader<'_>) -> Result<()> {
        if !self.done && !self.residual.is_empty() {
            let line = std::mem::take(&mut self.residual);
            self.line(&line, emit)?;
        }
        self.flush(emit)
    }

    fn line(&mut self, raw: &[u8], emit: &mut EmitHeader<'_>) -> Result<()> {
        if raw.is_empty() {
            self.done = true;
            return self.flush(emit);
        }

        let line = String::from_utf8_lossy(raw);
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = self.pending.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            } else {
                tracing::debug!(line = %line, "header continuation without a field");
            }
            return Ok(());
        }

        self.flush(emit)?;
        match line.split_once(':') {
            Some((name, value)) => {
                self.pending = Some((name.trim_end().to_string(), value.trim().to_string()));
            }
            None => tracing::debug!(line = %line, "header line without a colon"),
        }
        Ok(())
    }

    fn flush(&mut self, emit: &mut EmitHeader<'_>) -> Result<()> {
        match self.pending.take() {
            Some((name, value)) => emit(&name, &value),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::connection::FramedStream;
    use crate::connection::mock::MockStream;
    use crate::sink::{CollectingSink, SinkEvent};

    fn scan(chunks: &[&[u8]]) -> Vec<(String, String)> {
        let mut found = Vec::new();
        let mut scanner = HeaderScanner::default();
        let mut emit = |n: &str, v: &str| -> Result<()> {
            found.push((n.to_string(), v.to_string()));
            Ok(())
        };
        for chunk in chunks {
            scanner.feed(chunk, &mut emit).unwrap();
        }
        scanner.finish(&mut emit).unwrap();
        found
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_header_scan_single_chunk() {
        let found = scan(&[b"From: a@b.c\r\nSubject: hi\r\n\r\nbody: not a header\r\n"]);
        assert_eq!(found, pairs(&[("From", "a@b.c"), ("Subject", "hi")]));
    }

    #[test]
    fn test_header_split_across_chunks() {
        let found = scan(&[b"From: a@b.c\r\nSubj", b"ect: split", b" here\r\n\r\n"]);
        assert_eq!(found, pairs(&[("From", "a@b.c"), ("Subject", "split here")]));
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let found = scan(&[b"To: x\r", b"\nCc: y\r\n"]);
        assert_eq!(found, pairs(&[("To", "x"), ("Cc", "y")]));
    }

    #[test]
    fn test_folded_header_unfolded() {
        let found = scan(&[b"Subject: a long\r\n  subject line\r\nTo: z\r\n\r\n"]);
        assert_eq!(found, pairs(&[("Subject", "a long subject line"), ("To", "z")]));
    }

    #[test]
    fn test_unterminated_last_line() {
        let found = scan(&[b"X-Test: 1"]);
        assert_eq!(found, pairs(&[("X-Test", "1")]));
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let found = scan(&[b"not a header\r\nA: b\r\n"]);
        assert_eq!(found, pairs(&[("A", "b")]));
    }

    #[test]
    fn test_unterminated_run_stops_scan() {
        let mut found = Vec::new();
        let mut scanner = HeaderScanner::default();
        let mut emit = |n: &str, v: &str| -> Result<()> {
            found.push((n.to_string(), v.to_string()));
            Ok(())
        };
        scanner.feed(b"From: a@b.c\r\n", &mut emit).unwrap();
        let block = [b'A'; 8192];
        for _ in 0..(MAX_LINE_LENGTH / block.len() + 2) {
            scanner.feed(&block, &mut emit).unwrap();
        }
        assert!(scanner.done);
        assert!(scanner.residual.is_empty());
        assert!(scanner.residual.capacity() <= MAX_LINE_LENGTH);

        scanner.feed(b"\r\nTo: late\r\n", &mut emit).unwrap();
        scanner.finish(&mut emit).unwrap();
        assert_eq!(found, pairs(&[("From", "a@b.c")]));
    }

    #[test]
    fn test_stream_body_chunks() {
        let mut conn = FramedStream::new(MockStream::new(b"0123456789)\r\n"));
        let mut sink = CollectingSink::new();
        let id = CorrelationId(7);
        stream_body(&mut conn, &mut sink, id, "BODY[]", 10, 4, false).unwrap();

        let progress: Vec<_> = sink
            .events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::FetchBody { bytes_read, total, .. } => Some((*bytes_read, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(4, 10), (8, 10), (10, 10)]);
        assert_eq!(sink.body(id), b"0123456789");
        assert_eq!(conn.read_line().unwrap(), ")");
    }

    #[test]
    fn test_stream_body_zero_length() {
        let mut conn = FramedStream::new(MockStream::new(b")\r\n"));
        let mut sink = CollectingSink::new();
        stream_body(&mut conn, &mut sink, CorrelationId(1), "BODY[]", 0, 8, true).unwrap();
        assert_eq!(sink.events.len(), 1);
        assert_eq!(conn.read_line().unwrap(), ")");
    }

    #[test]
    fn test_stream_body_short_read_is_io_error() {
        let mut conn = FramedStream::new(MockStream::new(b"abc"));
        let mut sink = CollectingSink::new();
        let err =
            stream_body(&mut conn, &mut sink, CorrelationId(1), "RFC822", 10, 8, false).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_oversized_literal_rejected() {
        let mut conn = FramedStream::new(MockStream::new(b""));
        let mut sink = CollectingSink::new();
        let err = stream_body(
            &mut conn,
            &mut sink,
            CorrelationId(1),
            "RFC822",
            MAX_LITERAL_SIZE + 1,
            8,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_skip_and_read_small() {
        let mut conn = FramedStream::new(MockStream::new(b"abcdefINBOX"));
        skip(&mut conn, 6, 4).unwrap();
        assert_eq!(read_small(&mut conn, 5).unwrap(), "INBOX");
    }

    proptest! {
        #[test]
        fn header_scan_is_chunking_invariant(split in 1usize..60) {
            let raw: &[u8] = b"From: a@b.c\r\nSubject: one\r\n two\r\nX-Id: 42\r\n\r\nrest";
            let whole = scan(&[raw]);
            let chunks: Vec<&[u8]> = raw.chunks(split).collect();
            prop_assert_eq!(scan(&chunks), whole);
        }
    }
}
