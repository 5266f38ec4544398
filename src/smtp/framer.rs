//! Splits the client byte stream into command lines and message bodies

use std::io::{ErrorKind, Read};

/// Terminates a message body
const BODY_TERMINATOR: &[u8] = b"\r\n.\r\n";

const LINE_END: &[u8] = b"\r\n";

const READ_CHUNK: usize = 2048;

/// Buffers bytes read from a client and frames them.
///
/// In command mode each call to [`LineFramer::next_line`] yields one line with
/// its `\n` (and a preceding `\r`) removed. [`LineFramer::read_body`] switches
/// to body capture for a single message. Bytes past the current frame stay
/// buffered for the next call, so a client that sends several commands in one
/// packet is served in order.
#[derive(Debug)]
pub struct LineFramer<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: Read> LineFramer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Read the next command line.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. Bytes of an
    /// unterminated final line are discarded in that case.
    pub fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.buffer[scanned..].iter().position(|&b| b == b'\n') {
                let end = scanned + pos;
                let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            scanned = self.buffer.len();

            if self.fill()? == 0 {
                return Ok(None);
            }
        }
    }

    /// Capture a message body up to the `\r\n.\r\n` terminator.
    ///
    /// The CRLF that ended the `DATA` line counts as the start of the
    /// terminator, so a lone `.\r\n` is an empty message. The terminator is
    /// stripped and a CRLF appended when the body does not already end in a
    /// newline. Returns `Ok(None)` if the peer closes before the terminator
    /// arrives.
    pub fn read_body(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        self.buffer.splice(0..0, LINE_END.iter().copied());

        let mut scanned = 0;
        loop {
            if let Some(pos) = find(&self.buffer[scanned..], BODY_TERMINATOR) {
                let end = scanned + pos;
                if end == 0 {
                    self.buffer.drain(..BODY_TERMINATOR.len());
                    return Ok(Some(Vec::new()));
                }
                let mut body = self.buffer[LINE_END.len()..end].to_vec();
                self.buffer.drain(..end + BODY_TERMINATOR.len());
                if body.last() != Some(&b'\n') {
                    body.extend_from_slice(LINE_END);
                }
                return Ok(Some(body));
            }
            // The terminator may straddle two reads
            scanned = self.buffer.len().saturating_sub(BODY_TERMINATOR.len() - 1);

            if self.fill()? == 0 {
                self.buffer.clear();
                return Ok(None);
            }
        }
    }

    fn fill(&mut self) -> std::io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out its data a few bytes at a time
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn trickle(data: &[u8], step: usize) -> LineFramer<Trickle> {
        LineFramer::new(Trickle {
            data: data.to_vec(),
            pos: 0,
            step,
        })
    }

    #[test]
    fn test_crlf_and_lf_lines() {
        let mut framer = LineFramer::new(Cursor::new(b"HELO a\r\nNOOP\nQUIT\r\n".to_vec()));
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("HELO a"));
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("NOOP"));
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("QUIT"));
        assert_eq!(framer.next_line().unwrap(), None);
    }

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let mut framer = trickle(b"MAIL FROM:<a@b>\r\n", 3);
        assert_eq!(
            framer.next_line().unwrap().as_deref(),
            Some("MAIL FROM:<a@b>")
        );
    }

    #[test]
    fn test_unterminated_line_at_eof() {
        let mut framer = LineFramer::new(Cursor::new(b"QUI".to_vec()));
        assert_eq!(framer.next_line().unwrap(), None);
    }

    #[test]
    fn test_read_error_is_distinct_from_eof() {
        let mut framer = LineFramer::new(Broken);
        let err = framer.next_line().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut framer = LineFramer::new(Cursor::new(b"\xff\xfe HELO\r\n".to_vec()));
        let line = framer.next_line().unwrap().unwrap();
        assert!(line.ends_with(" HELO"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[test]
    fn test_body_terminator() {
        let mut framer = LineFramer::new(Cursor::new(b"hello\r\n.\r\nQUIT\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"hello\r\n");
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("QUIT"));
    }

    #[test]
    fn test_body_split_across_reads() {
        let mut framer = trickle(b"Subject: hi\r\n\r\nline one\r\nline two\r\n.\r\n", 4);
        assert_eq!(
            framer.read_body().unwrap().unwrap(),
            b"Subject: hi\r\n\r\nline one\r\nline two\r\n"
        );
        assert_eq!(framer.next_line().unwrap(), None);
    }

    #[test]
    fn test_body_keeps_bare_newline_ending() {
        let mut framer = LineFramer::new(Cursor::new(b"a\nb\n\r\n.\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"a\nb\n");
    }

    #[test]
    fn test_body_lines_with_dots_are_kept() {
        let mut framer = LineFramer::new(Cursor::new(b"..x\r\n.y\r\n.\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"..x\r\n.y\r\n");
    }

    #[test]
    fn test_empty_body() {
        let mut framer = LineFramer::new(Cursor::new(b".\r\nNOOP\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"");
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("NOOP"));
    }

    #[test]
    fn test_empty_body_arriving_in_pieces() {
        let mut framer = trickle(b".\r\nQUIT\r\n", 1);
        assert_eq!(framer.read_body().unwrap().unwrap(), b"");
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("QUIT"));
    }

    #[test]
    fn test_single_line_and_blank_line_bodies() {
        let mut framer = LineFramer::new(Cursor::new(b"a\r\n.\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"a\r\n");
        let mut framer = LineFramer::new(Cursor::new(b"\r\n.\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"\r\n");
    }

    #[test]
    fn test_body_eof_before_terminator() {
        let mut framer = LineFramer::new(Cursor::new(b"unfinished\r\n".to_vec()));
        assert_eq!(framer.read_body().unwrap(), None);
    }

    #[test]
    fn test_buffered_bytes_after_command_feed_body() {
        let mut framer = LineFramer::new(Cursor::new(b"DATA\r\nbody\r\n.\r\n".to_vec()));
        assert_eq!(framer.next_line().unwrap().as_deref(), Some("DATA"));
        assert_eq!(framer.read_body().unwrap().unwrap(), b"body\r\n");
    }
}
