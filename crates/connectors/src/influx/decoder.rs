//! Streaming decoder for the annotated CSV dialect returned by `/api/v2/query`.
//!
//! A response is a sequence of blocks. Each block opens with annotation rows
//! (`#datatype`, `#group`, `#default`), followed by a header row and data
//! rows. Blocks are separated by a blank line, and annotations are optional.
//! The first column of every row is reserved for annotations and is empty on
//! header and data rows.

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use model::{
    core::value::{FieldValue, Value},
    records::row::SourceRow,
};
use std::io::Read;
use tracing::debug;

const ANNOTATION_DATATYPE: &[u8] = b"#datatype";
const ANNOTATION_DEFAULT: &[u8] = b"#default";
const TABLE_COLUMN: &str = "table";

#[derive(Debug, Default)]
struct Block {
    datatypes: Vec<String>,
    defaults: Vec<Vec<u8>>,
    header: Option<Vec<String>>,
}

impl Block {
    fn datatype(&self, index: usize) -> &str {
        self.datatypes.get(index).map(String::as_str).unwrap_or("string")
    }

    fn default_value(&self, index: usize) -> &[u8] {
        self.defaults.get(index).map(Vec::as_slice).unwrap_or_default()
    }
}

pub struct AnnotatedCsvDecoder<R> {
    reader: csv::Reader<R>,
    record: csv::ByteRecord,
    block: Block,
    finished: bool,
    blocks_seen: usize,
}

impl<R: Read> AnnotatedCsvDecoder<R> {
    pub fn new(input: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        Self {
            reader,
            record: csv::ByteRecord::new(),
            block: Block::default(),
            finished: false,
            blocks_seen: 0,
        }
    }
}

impl<R: Read> Iterator for AnnotatedCsvDecoder<R> {
    type Item = Result<SourceRow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(blocks = self.blocks_seen, "Source response fully decoded");
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(SourceError::Decode(e)));
                }
            }

            if self.block.header.is_some() && self.follows_blank_line() {
                self.block = Block::default();
            }

            let first = self.record.get(0).unwrap_or_default();

            if first.starts_with(b"#") {
                if self.block.header.is_some() {
                    self.block = Block::default();
                }
                if first == ANNOTATION_DATATYPE {
                    self.block.datatypes = self
                        .record
                        .iter()
                        .map(|cell| String::from_utf8_lossy(cell).into_owned())
                        .collect();
                } else if first == ANNOTATION_DEFAULT {
                    self.block.defaults = self.record.iter().map(<[u8]>::to_vec).collect();
                }
                continue;
            }

            let Some(header) = self.block.header.as_ref() else {
                self.block.header = Some(
                    self.record
                        .iter()
                        .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
                        .collect(),
                );
                self.blocks_seen += 1;
                continue;
            };

            if is_error_header(header) {
                let message = error_message(header, &self.record);
                self.finished = true;
                return Some(Err(SourceError::Query(message)));
            }

            return Some(Ok(decode_row(&self.block, header, &self.record)));
        }
    }
}

impl<R: Read> AnnotatedCsvDecoder<R> {
    /// The reader drops empty lines, so a skipped line shows up as more line
    /// breaks consumed than the record itself accounts for.
    fn follows_blank_line(&self) -> bool {
        let Some(start) = self.record.position().map(csv::Position::line) else {
            return false;
        };
        let consumed = self.reader.position().line().saturating_sub(start);
        let embedded: u64 = self
            .record
            .iter()
            .map(|cell| cell.iter().filter(|&&b| b == b'\n').count() as u64)
            .sum();
        consumed > embedded + 1
    }
}

fn is_error_header(header: &[String]) -> bool {
    header.iter().any(|h| h == "error") && header.iter().any(|h| h == "reference")
}

fn error_message(header: &[String], record: &csv::ByteRecord) -> String {
    let cell = |column: &str| {
        header
            .iter()
            .position(|h| h == column)
            .and_then(|i| record.get(i))
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .unwrap_or_default()
    };

    let message = cell("error");
    let reference = cell("reference");
    if reference.is_empty() {
        message
    } else {
        format!("{message} (reference {reference})")
    }
}

fn decode_row(block: &Block, header: &[String], record: &csv::ByteRecord) -> SourceRow {
    let mut table = 0;
    let mut fields = Vec::with_capacity(header.len());

    for (index, name) in header.iter().enumerate() {
        if name.is_empty() {
            continue;
        }

        let mut raw = record.get(index).unwrap_or_default();
        if raw.is_empty() {
            raw = block.default_value(index);
        }

        let value = if raw.is_empty() {
            Value::Null
        } else {
            decode_cell(raw, block.datatype(index))
        };

        if name == TABLE_COLUMN
            && let Value::Int(t) = value
        {
            table = t;
        }
        fields.push(FieldValue::new(name.clone(), value));
    }

    SourceRow::new(table, fields)
}

/// Decodes one cell according to its `#datatype` annotation. A cell that does
/// not parse as its declared type is kept as a string; a cell that is not
/// UTF-8 is kept as raw bytes.
fn decode_cell(raw: &[u8], datatype: &str) -> Value {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Value::Bytes(raw.to_vec());
    };

    let typed = match datatype {
        "double" => text.parse::<f64>().ok().map(Value::Float),
        "long" => text.parse::<i64>().ok().map(Value::Int),
        "unsignedLong" => text.parse::<u64>().ok().map(Value::Uint),
        "boolean" => match text {
            "true" => Some(Value::Boolean(true)),
            "false" => Some(Value::Boolean(false)),
            _ => None,
        },
        dt if dt.starts_with("dateTime") => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|ts| Value::Timestamp(ts.with_timezone(&Utc))),
        _ => None,
    };

    typed.unwrap_or_else(|| Value::String(text.to_string()))
}
