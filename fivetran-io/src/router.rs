//! Message routing between upstream streams and their stream maps

use crate::config::MapperConfig;
use ahash::AHashMap;
use chrono::Utc;
use fivetran_codec::stages::format_timestamp;
use fivetran_codec::{FlatteningOptions, StreamMap};
use fivetran_format::{JsonMap, MapperError, Message, RecordMessage, Result, SchemaMessage};
use smallvec::{smallvec, SmallVec};
use tracing::{debug, info, trace};

/// Stream maps registered for one upstream stream
pub type StreamMaps = SmallVec<[StreamMap; 1]>;

/// Messages produced from one input message
pub type MappedMessages = SmallVec<[Message; 1]>;

/// Routes parsed messages to the stream maps registered for their stream.
///
/// A stream is registered by its SCHEMA message. Registering a stream again
/// with a different schema or key replaces its maps wholesale.
#[derive(Debug, Default)]
pub struct MapperRouter {
    flattening: FlatteningOptions,
    stream_maps: AHashMap<String, StreamMaps>,
}

impl MapperRouter {
    /// Create a router applying `flattening` to every stream
    pub fn new(flattening: FlatteningOptions) -> Self {
        Self {
            flattening,
            stream_maps: AHashMap::new(),
        }
    }

    /// Create a router from mapper settings
    pub fn from_config(config: &MapperConfig) -> Self {
        Self::new(config.flattening_options())
    }

    /// Flattening options handed to new stream maps
    pub fn flattening(&self) -> &FlatteningOptions {
        &self.flattening
    }

    /// Stream maps registered for `stream`, if any
    pub fn stream_maps(&self, stream: &str) -> Option<&[StreamMap]> {
        self.stream_maps.get(stream).map(|maps| maps.as_slice())
    }

    /// Check whether a SCHEMA has been seen for `stream`
    pub fn is_registered(&self, stream: &str) -> bool {
        self.stream_maps.contains_key(stream)
    }

    /// Number of registered upstream streams
    pub fn stream_count(&self) -> usize {
        self.stream_maps.len()
    }

    /// Register (or re-register) the raw schema of an upstream stream.
    ///
    /// A declaration identical to the current one keeps the existing maps.
    /// On error the previous registration, if any, is left in place.
    pub fn register_raw_stream_schema(
        &mut self,
        stream: &str,
        schema: &JsonMap,
        key_properties: &[String],
    ) -> Result<&[StreamMap]> {
        let unchanged = self
            .stream_maps
            .get(stream)
            .and_then(|maps| maps.first())
            .is_some_and(|primary| primary.is_built_from(schema, key_properties));

        if unchanged {
            trace!(stream = %stream, "schema unchanged, keeping stream maps");
        } else {
            if self.is_registered(stream) {
                info!(stream = %stream, "schema changed, regenerating stream maps");
            }
            let stream_map =
                StreamMap::new(stream, schema, key_properties, self.flattening.clone())?;
            self.stream_maps
                .insert(stream.to_string(), smallvec![stream_map]);
        }

        Ok(self.stream_maps(stream).unwrap_or_default())
    }

    /// Map one message to the messages to emit downstream
    pub fn map_message(&mut self, message: Message) -> Result<MappedMessages> {
        match message {
            Message::Schema(schema) => self.map_schema_message(schema),
            Message::Record(record) => self.map_record_message(record),
            Message::State(payload) => Ok(self.map_state_message(payload)),
            Message::ActivateVersion(payload) => Ok(self.map_activate_version_message(payload)),
        }
    }

    /// Register the stream and emit one transformed SCHEMA per stream map
    pub fn map_schema_message(&mut self, message: SchemaMessage) -> Result<MappedMessages> {
        let SchemaMessage {
            stream,
            schema,
            key_properties,
            bookmark_keys,
        } = message;

        let stream_maps = self.register_raw_stream_schema(&stream, &schema, &key_properties)?;
        Ok(stream_maps
            .iter()
            .map(|stream_map| {
                Message::Schema(SchemaMessage {
                    stream: stream_map.stream_alias().to_string(),
                    schema: stream_map.transformed_schema().clone(),
                    key_properties: stream_map.transformed_key_properties().to_vec(),
                    bookmark_keys: bookmark_keys.clone(),
                })
            })
            .collect())
    }

    /// Transform a record through every stream map of its stream
    pub fn map_record_message(&self, message: RecordMessage) -> Result<MappedMessages> {
        let stream_maps = self
            .stream_maps
            .get(&message.stream)
            .ok_or_else(|| MapperError::UnknownStream(message.stream.clone()))?;

        let time_extracted = format_timestamp(Utc::now());
        let mut mapped = MappedMessages::new();
        for stream_map in stream_maps {
            let Some(record) = stream_map.transform(message.record.clone())? else {
                debug!(stream = %message.stream, "record filtered out");
                continue;
            };
            mapped.push(Message::Record(RecordMessage {
                stream: stream_map.stream_alias().to_string(),
                record,
                version: message.version.clone(),
                time_extracted: Some(time_extracted.clone()),
            }));
        }
        Ok(mapped)
    }

    /// STATE passes through unchanged
    pub fn map_state_message(&self, payload: JsonMap) -> MappedMessages {
        smallvec![Message::State(payload)]
    }

    /// ACTIVATE_VERSION passes through unchanged
    pub fn map_activate_version_message(&self, payload: JsonMap) -> MappedMessages {
        smallvec![Message::ActivateVersion(payload)]
    }
}
