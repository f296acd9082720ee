//! Line-delimited message reader

use fivetran_format::{Message, Result};
use std::io::BufRead;
use tracing::trace;

/// Reads Singer messages, one JSON object per line.
///
/// Blank lines are skipped. Each item is the parse result of one line; after
/// an error the reader can keep going, but the pipeline stops at the first one.
pub struct MessageReader<R: BufRead> {
    input: R,
    buf: String,
    line_number: u64,
    lines_read: u64,
}

impl<R: BufRead> MessageReader<R> {
    /// Wrap a buffered reader
    pub fn new(input: R) -> Self {
        Self {
            input,
            buf: String::new(),
            line_number: 0,
            lines_read: 0,
        }
    }

    /// 1-based number of the line last returned (blank lines included)
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Non-blank lines read so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Read the next message, or `None` at end of input
    pub fn next_message(&mut self) -> Option<Result<Message>> {
        loop {
            self.buf.clear();
            match self.input.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                trace!(line = self.line_number, "skipping blank line");
                continue;
            }
            self.lines_read += 1;
            return Some(Message::from_line(line));
        }
    }
}

impl<R: BufRead> Iterator for MessageReader<R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message()
    }
}
