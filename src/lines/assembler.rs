/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Finds the next CR LF sequence in `buf[start..end]` and returns the index of its LF.
///
/// A bare CR (one not followed by LF) is skipped and the scan goes on past it. A CR in the
/// last position cannot be confirmed as an EOL and is not matched.
fn find_eol(buf: &[u8], start: usize, end: usize) -> Option<usize> {
    if start >= end {
        return None;
    }
    buf[start..end]
        .windows(2)
        .position(|pair| pair[0] == CR && pair[1] == LF)
        .map(|cr| start + cr + 1)
}

/// Strips the trailing CR LF of a completed line.
fn to_line(bytes: &[u8]) -> &[u8] {
    debug_assert!(bytes.len() >= 2);
    debug_assert_eq!(bytes[bytes.len() - 2], CR);
    debug_assert_eq!(bytes[bytes.len() - 1], LF);
    &bytes[..bytes.len() - 2]
}

/// Extracts the lines contained in a stream of byte chunks, e.g. the payloads of
/// consecutive WebSocket frames.
///
/// A line is terminated by exactly `\r\n`; a bare `\r` or `\n` is ordinary content. A chunk
/// may start or end in the middle of a line, or even between the CR and the LF of a
/// terminator: the unterminated tail is kept and prefixed to the next chunk.
///
/// # Examples
///
/// ```
/// use lightstreamer_transport::lines::LineAssembler;
///
/// let mut assembler = LineAssembler::new();
/// let mut lines = Vec::new();
/// assembler.read_bytes(b"CONOK,S1,50000,5000,*\r\nPRO", |line| lines.push(line.to_string()));
/// assembler.read_bytes(b"BE\r\n", |line| lines.push(line.to_string()));
/// assert_eq!(lines, vec!["CONOK,S1,50000,5000,*", "PROBE"]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct LineAssembler {
    line_part: Vec<u8>,
}

impl LineAssembler {
    /// Creates an assembler with no pending content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk and calls `on_line` once per complete line, in order, without
    /// the terminator.
    ///
    /// A chunk has the shape `<head>? <line>* <tail>?`: the head completes a line started
    /// in previous chunks, the body is a run of whole lines, and the tail is an
    /// unterminated line part carried over to the next call.
    pub fn read_bytes<F>(&mut self, buf: &[u8], mut on_line: F)
    where
        F: FnMut(&str),
    {
        let end = buf.len();
        if end == 0 {
            return;
        }
        // `start` and `eol` always move together: they delimit the next part to process.
        let mut start = 0;
        let mut eol;

        // head
        if !self.line_part.is_empty() {
            let split_eol = self.line_part.last() == Some(&CR) && buf[0] == LF;
            eol = if split_eol {
                Some(0)
            } else {
                find_eol(buf, start, end)
            };
            if let Some(head_eol) = eol {
                self.line_part.extend_from_slice(&buf[start..=head_eol]);
                on_line(&String::from_utf8_lossy(to_line(&self.line_part)));
                self.line_part.clear();

                start = head_eol + 1;
                eol = find_eol(buf, start, end);
            }
        } else {
            eol = find_eol(buf, start, end);
        }

        // body
        while let Some(body_eol) = eol {
            on_line(&String::from_utf8_lossy(&buf[start..body_eol - 1]));

            start = body_eol + 1;
            eol = find_eol(buf, start, end);
        }

        // tail
        if start != end {
            self.line_part.extend_from_slice(&buf[start..end]);
        }
    }

    /// The bytes of the current unterminated line.
    pub fn pending(&self) -> &[u8] {
        &self.line_part
    }

    /// Returns true while a line started in a previous chunk is still incomplete.
    pub fn has_pending(&self) -> bool {
        !self.line_part.is_empty()
    }

    /// Discards the pending partial line.
    pub fn reset(&mut self) {
        self.line_part.clear();
    }
}
