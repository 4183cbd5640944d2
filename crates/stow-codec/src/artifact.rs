use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// The kind of an in-memory artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Table,
    Object,
    Text,
    Binary,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Object => write!(f, "object"),
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// An in-memory value a processor can serialize.
#[derive(Clone, Debug, PartialEq)]
pub enum Artifact {
    Table(Table),
    /// Any JSON-representable value.
    Object(serde_json::Value),
    Text(String),
    Binary(Vec<u8>),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Table(_) => ArtifactKind::Table,
            Self::Object(_) => ArtifactKind::Object,
            Self::Text(_) => ArtifactKind::Text,
            Self::Binary(_) => ArtifactKind::Binary,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<serde_json::Value> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_binary(self) -> Option<Vec<u8>> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl From<Table> for Artifact {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<serde_json::Value> for Artifact {
    fn from(value: serde_json::Value) -> Self {
        Self::Object(value)
    }
}

impl From<String> for Artifact {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Artifact {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Artifact {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

/// A single table cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Estimated in-memory footprint in bytes.
    ///
    /// Scalars count as one 8-byte slot; text adds its UTF-8 length.
    pub fn footprint(&self) -> u64 {
        match self {
            Self::Text(s) => 8 + s.len() as u64,
            _ => 8,
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Row-oriented table with named columns.
///
/// Every row has exactly one cell per column; constructors enforce this.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// An empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, checking every row's width.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Cell>>) -> CodecResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<Cell>) -> CodecResult<()> {
        if row.len() != self.columns.len() {
            return Err(CodecError::RowShape {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Estimated in-memory footprint of all cells, in bytes.
    pub fn estimated_bytes(&self) -> u64 {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .map(Cell::footprint)
            .sum()
    }

    /// A new table holding the rows in `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows[range].to_vec(),
        }
    }

    /// Concatenate tables in order. All parts must share the same columns.
    pub fn concat(parts: Vec<Table>) -> CodecResult<Self> {
        let mut parts = parts.into_iter();
        let Some(mut combined) = parts.next() else {
            return Ok(Self::default());
        };
        for part in parts {
            if part.columns != combined.columns {
                return Err(CodecError::ColumnMismatch {
                    expected: combined.columns.clone(),
                    actual: part.columns,
                });
            }
            combined.rows.extend(part.rows);
        }
        Ok(combined)
    }
}
