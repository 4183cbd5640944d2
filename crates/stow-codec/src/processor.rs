//! Format processors: stateless codecs between an [`Artifact`] and a byte
//! stream.

use std::io::{BufRead, BufReader, Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stow_store::Encoding;

use crate::artifact::{Artifact, Cell, Table};
use crate::error::{CodecError, CodecResult};

/// zstd level for packed tables and fragments.
pub(crate) const ZSTD_LEVEL: i32 = 3;

/// Codec for one artifact kind.
///
/// Processors hold no state between calls. `dump` must reject artifacts of
/// a kind it does not handle before writing anything.
pub trait Processor: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// How the backend should open the stream.
    fn encoding(&self) -> Encoding;

    fn load(&self, reader: &mut dyn Read) -> CodecResult<Artifact>;

    fn dump(&self, artifact: &Artifact, writer: &mut dyn Write) -> CodecResult<()>;
}

fn unsupported(processor: &'static str, artifact: &Artifact) -> CodecError {
    CodecError::UnsupportedArtifact {
        processor,
        kind: artifact.kind(),
    }
}

/// UTF-8 text.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextProcessor;

impl Processor for TextProcessor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn encoding(&self) -> Encoding {
        Encoding::Text
    }

    fn load(&self, reader: &mut dyn Read) -> CodecResult<Artifact> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Artifact::Text(text))
    }

    fn dump(&self, artifact: &Artifact, writer: &mut dyn Write) -> CodecResult<()> {
        let Artifact::Text(text) = artifact else {
            return Err(unsupported(self.name(), artifact));
        };
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Raw bytes, written verbatim.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryProcessor;

impl Processor for BinaryProcessor {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn encoding(&self) -> Encoding {
        Encoding::Binary
    }

    fn load(&self, reader: &mut dyn Read) -> CodecResult<Artifact> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Artifact::Binary(bytes))
    }

    fn dump(&self, artifact: &Artifact, writer: &mut dyn Write) -> CodecResult<()> {
        let Artifact::Binary(bytes) = artifact else {
            return Err(unsupported(self.name(), artifact));
        };
        writer.write_all(bytes)?;
        Ok(())
    }
}

/// Generic objects as pretty-printed JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonObjectProcessor;

impl Processor for JsonObjectProcessor {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encoding(&self) -> Encoding {
        Encoding::Text
    }

    fn load(&self, reader: &mut dyn Read) -> CodecResult<Artifact> {
        let value: Value = serde_json::from_reader(reader)?;
        Ok(Artifact::Object(value))
    }

    fn dump(&self, artifact: &Artifact, writer: &mut dyn Write) -> CodecResult<()> {
        let Artifact::Object(value) = artifact else {
            return Err(unsupported(self.name(), artifact));
        };
        serde_json::to_writer_pretty(&mut *writer, value)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Header line of the JSON-lines table format.
#[derive(Serialize, Deserialize)]
struct JsonLinesHeader {
    columns: Vec<String>,
}

/// Tables as JSON lines: a `{"columns": [...]}` header, then one JSON array
/// per row.
///
/// Lossy for non-finite floats, which JSON renders as `null`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLinesTableProcessor;

impl JsonLinesTableProcessor {
    fn cell_to_json(cell: &Cell) -> Value {
        match cell {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Value::from(*f),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }

    fn json_to_cell(value: Value, line: usize) -> CodecResult<Cell> {
        match value {
            Value::Null => Ok(Cell::Null),
            Value::Bool(b) => Ok(Cell::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Cell::Int(i)),
                None => n.as_f64().map(Cell::Float).ok_or_else(|| CodecError::Malformed {
                    format: "jsonl",
                    reason: format!("line {line}: number {n} out of range"),
                }),
            },
            Value::String(s) => Ok(Cell::Text(s)),
            other => Err(CodecError::Malformed {
                format: "jsonl",
                reason: format!("line {line}: nested value {other} in cell"),
            }),
        }
    }
}

impl Processor for JsonLinesTableProcessor {
    fn name(&self) -> &'static str {
        "jsonl-table"
    }

    fn encoding(&self) -> Encoding {
        Encoding::Text
    }

    fn load(&self, reader: &mut dyn Read) -> CodecResult<Artifact> {
        let mut lines = BufReader::new(reader).lines();
        let header = lines.next().ok_or_else(|| CodecError::Malformed {
            format: "jsonl",
            reason: "missing header line".into(),
        })??;
        let header: JsonLinesHeader = serde_json::from_str(&header)?;
        let mut table = Table::new(header.columns);

        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let values: Vec<Value> = serde_json::from_str(&line)?;
            let row = values
                .into_iter()
                .map(|v| Self::json_to_cell(v, line_no))
                .collect::<CodecResult<Vec<_>>>()?;
            table.push_row(row)?;
        }
        Ok(Artifact::Table(table))
    }

    fn dump(&self, artifact: &Artifact, writer: &mut dyn Write) -> CodecResult<()> {
        let Artifact::Table(table) = artifact else {
            return Err(unsupported(self.name(), artifact));
        };
        let header = JsonLinesHeader {
            columns: table.columns().to_vec(),
        };
        serde_json::to_writer(&mut *writer, &header)?;
        writer.write_all(b"\n")?;
        for row in table.rows() {
            let values: Vec<Value> = row.iter().map(Self::cell_to_json).collect();
            serde_json::to_writer(&mut *writer, &values)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Tables as zstd-compressed bincode. Exact for every cell type.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackedTableProcessor;

impl PackedTableProcessor {
    pub(crate) fn encode(table: &Table, writer: &mut dyn Write) -> CodecResult<()> {
        let raw = bincode::serialize(table).map_err(|e| CodecError::Serialization(e.to_string()))?;
        let compressed = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        writer.write_all(&compressed)?;
        Ok(())
    }

    pub(crate) fn decode(reader: &mut dyn Read) -> CodecResult<Table> {
        let raw = zstd::decode_all(reader).map_err(|e| CodecError::Decompression(e.to_string()))?;
        bincode::deserialize(&raw).map_err(|e| CodecError::Serialization(e.to_string()))
    }
}

impl Processor for PackedTableProcessor {
    fn name(&self) -> &'static str {
        "packed-table"
    }

    fn encoding(&self) -> Encoding {
        Encoding::Binary
    }

    fn load(&self, reader: &mut dyn Read) -> CodecResult<Artifact> {
        Self::decode(reader).map(Artifact::Table)
    }

    fn dump(&self, artifact: &Artifact, writer: &mut dyn Write) -> CodecResult<()> {
        let Artifact::Table(table) = artifact else {
            return Err(unsupported(self.name(), artifact));
        };
        Self::encode(table, writer)
    }
}
