//! Fivetran mapper I/O - Message routing and streaming APIs
//!
//! This crate drives the mapping engine over a Singer message stream:
//!
//! - Line-delimited message reader and writer
//! - [`MapperRouter`], the per-stream registry and message dispatch
//! - Configuration loading
//! - High-level [`map_stream`] / [`execute_map`] entry points

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod about;
pub mod config;
pub mod reader;
pub mod router;
pub mod writer;

// Re-export commonly used types
pub use fivetran_codec::{FlatteningOptions, StreamMap};
pub use fivetran_format::{JsonMap, MapperError, Message, MessageKind, Result};

pub use about::{AboutFormat, AboutInfo};
pub use config::{ConfigSource, MapperConfig};
pub use reader::MessageReader;
pub use router::MapperRouter;
pub use writer::MessageWriter;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use tracing::{error, info};

/// Counters collected while mapping a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapSummary {
    /// Non-blank input lines
    pub lines_read: u64,
    /// Messages written downstream
    pub messages_written: u64,
    /// SCHEMA messages received
    pub schemas: u64,
    /// RECORD messages received
    pub records: u64,
    /// STATE messages received
    pub states: u64,
    /// ACTIVATE_VERSION messages received
    pub activate_versions: u64,
}

impl MapSummary {
    fn count(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Schema => self.schemas += 1,
            MessageKind::Record => self.records += 1,
            MessageKind::State => self.states += 1,
            MessageKind::ActivateVersion => self.activate_versions += 1,
            MessageKind::Batch => {}
        }
    }
}

/// Input source for a mapping run
pub enum InputSource {
    /// Standard input
    Stdin,
    /// A file of Singer messages
    Path(PathBuf),
    /// Arbitrary reader
    Reader(Box<dyn Read + Send>),
}

/// Output sink for a mapping run
pub enum OutputSink {
    /// Standard output
    Stdout,
    /// Arbitrary writer
    Writer(Box<dyn Write + Send>),
}

/// A complete mapping run
pub struct MapRequest {
    /// Where messages come from
    pub input: InputSource,
    /// Where mapped messages go
    pub output: OutputSink,
    /// Mapper settings
    pub config: MapperConfig,
}

/// Map every message of `input` to `output` through `router`.
///
/// Stops at the first error; messages mapped before it have already been
/// written and flushed.
pub fn map_stream<R: BufRead, W: Write>(
    input: R,
    output: W,
    router: &mut MapperRouter,
) -> Result<MapSummary> {
    let mut reader = MessageReader::new(input);
    let mut writer = MessageWriter::new(output);
    let mut summary = MapSummary::default();

    let outcome = pump(&mut reader, &mut writer, router, &mut summary);
    summary.lines_read = reader.lines_read();
    summary.messages_written = writer.messages_written();

    if let Err(e) = &outcome {
        error!(line = reader.line_number(), error = %e, "mapping stopped");
    }
    writer.flush()?;
    outcome?;

    info!(
        lines_read = summary.lines_read,
        messages_written = summary.messages_written,
        schemas = summary.schemas,
        records = summary.records,
        states = summary.states,
        activate_versions = summary.activate_versions,
        streams = router.stream_count(),
        "mapping finished"
    );
    Ok(summary)
}

fn pump<R: BufRead, W: Write>(
    reader: &mut MessageReader<R>,
    writer: &mut MessageWriter<W>,
    router: &mut MapperRouter,
    summary: &mut MapSummary,
) -> Result<()> {
    for message in reader {
        let message = message?;
        summary.count(message.kind());
        for mapped in router.map_message(message)? {
            writer.write_message(&mapped)?;
        }
    }
    Ok(())
}

/// Run a complete mapping request
pub fn execute_map(request: MapRequest) -> Result<MapSummary> {
    let MapRequest {
        input,
        output,
        config,
    } = request;
    let mut router = MapperRouter::from_config(&config);

    let input: Box<dyn BufRead> = match input {
        InputSource::Stdin => Box::new(io::stdin().lock()),
        InputSource::Path(path) => Box::new(BufReader::new(File::open(path)?)),
        InputSource::Reader(reader) => Box::new(BufReader::new(reader)),
    };
    match output {
        OutputSink::Stdout => map_stream(input, io::stdout().lock(), &mut router),
        OutputSink::Writer(writer) => map_stream(input, writer, &mut router),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_summary_counts() {
        let input = concat!(
            "{\"type\":\"SCHEMA\",\"stream\":\"s\",\"schema\":{\"properties\":{}},\"key_properties\":[]}\n",
            "\n",
            "{\"type\":\"RECORD\",\"stream\":\"s\",\"record\":{\"a\":1}}\n",
            "{\"type\":\"STATE\",\"value\":{}}\n",
        );
        let mut output = Vec::new();
        let summary = map_stream(
            Cursor::new(input),
            &mut output,
            &mut MapperRouter::default(),
        )
        .unwrap();

        assert_eq!(
            summary,
            MapSummary {
                lines_read: 3,
                messages_written: 3,
                schemas: 1,
                records: 1,
                states: 1,
                activate_versions: 0,
            }
        );
        assert_eq!(String::from_utf8(output).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_output_before_error_is_flushed() {
        let input = "{\"type\":\"STATE\",\"value\":1}\n{\"type\":\"RECORD\",\"stream\":\"s\",\"record\":{}}\n";
        let mut output = Vec::new();
        let err = map_stream(
            Cursor::new(input),
            &mut output,
            &mut MapperRouter::default(),
        )
        .unwrap_err();

        assert!(matches!(err, MapperError::UnknownStream(_)));
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "{\"type\":\"STATE\",\"value\":1}\n"
        );
    }

    #[test]
    fn test_execute_map_with_reader_and_writer() {
        let input = "{\"type\":\"STATE\",\"value\":{\"k\":1}}\n";
        let summary = execute_map(MapRequest {
            input: InputSource::Reader(Box::new(Cursor::new(input))),
            output: OutputSink::Writer(Box::new(io::sink())),
            config: MapperConfig::default(),
        })
        .unwrap();
        assert_eq!(summary.states, 1);
    }
}
