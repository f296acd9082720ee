//! Line-delimited message writer

use fivetran_format::{Message, MessageKind, Result};
use std::io::{BufWriter, Write};

/// Writes Singer messages as one compact JSON object per line.
///
/// Output is buffered; STATE messages flush the buffer so that a checkpoint
/// never reaches downstream ahead of the records it covers.
pub struct MessageWriter<W: Write> {
    output: BufWriter<W>,
    messages_written: u64,
}

impl<W: Write> MessageWriter<W> {
    /// Wrap a writer
    pub fn new(output: W) -> Self {
        Self {
            output: BufWriter::new(output),
            messages_written: 0,
        }
    }

    /// Write one message followed by `\n`
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.output, message)?;
        self.output.write_all(b"\n")?;
        self.messages_written += 1;

        if message.kind() == MessageKind::State {
            self.output.flush()?;
        }
        Ok(())
    }

    /// Messages written so far
    pub fn messages_written(&self) -> u64 {
        self.messages_written
    }

    /// Flush buffered output
    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }

    /// Flush and return the inner writer
    pub fn finish(self) -> Result<W> {
        self.output
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}
