//! Surrogate key derivation
//!
//! The key is the MD5 digest of the record serialized in its current key
//! order, so two records with the same content but a different key order get
//! different keys. The layout matches Python's `json.dumps` defaults
//! (`", "` / `": "` separators, ASCII-only output) so keys line up with
//! rows produced by the Python Fivetran mapper for string, integer, boolean
//! and null values. Floats use the shortest round-trip representation.
//!
//! Not used for security purposes.

use fivetran_format::{JsonMap, Result};
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Derive the surrogate key of a record: 32 lower-case hex characters.
pub fn derive_surrogate_key(record: &JsonMap) -> Result<String> {
    let payload = to_key_payload(record)?;
    Ok(format!("{:x}", Md5::digest(payload.as_bytes())))
}

/// Serialize a record the way the key digest sees it
pub fn to_key_payload(record: &JsonMap) -> Result<String> {
    let mut buf = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    record.serialize(&mut serializer)?;
    // the formatter only ever writes ASCII
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `{"a": 1, "b": [true, null]}` with every non-printable-ASCII character escaped
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for c in fragment.chars() {
            if (' '..='~').contains(&c) {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
