//! Multi-row `INSERT ... ON CONFLICT DO NOTHING` rendering.

use model::core::dimension::Dimension;
use serde::Serialize;
use std::fmt::Write as _;

/// Rows per statement. Seven parameters per row keeps a full chunk far below
/// the 65535 bind-parameter limit of the Postgres protocol.
pub const CHUNK_ROWS: usize = 1000;

/// Destination table and the name of its version-tag column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableTarget {
    /// Table name, optionally schema-qualified (`schema.table`).
    pub table: String,
    pub version_column: String,
}

impl Default for TableTarget {
    fn default() -> Self {
        Self {
            table: "aggregated_data".to_string(),
            version_column: "version_tag".to_string(),
        }
    }
}

impl TableTarget {
    pub fn new(table: impl Into<String>, version_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            version_column: version_column.into(),
        }
    }

    pub fn qualified_table(&self) -> String {
        self.table
            .split('.')
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Destination columns in bind order: six dimensions, then the measure.
    pub fn columns(&self) -> Vec<String> {
        Dimension::ALL
            .iter()
            .map(|d| match d {
                Dimension::VersionTag => self.version_column.as_str(),
                other => other.as_str(),
            })
            .chain(std::iter::once("value"))
            .map(quote_identifier)
            .collect()
    }
}

pub fn quote_identifier(ident: &str) -> String {
    format!(r#""{}""#, ident.replace('"', r#""""#))
}

/// Renders an insert of `rows` tuples with positional parameters, silently
/// discarding tuples whose key already exists.
pub fn render_insert(target: &TableTarget, rows: usize) -> String {
    let columns = target.columns();
    let width = columns.len();
    let header = format!(
        "INSERT INTO {} ({}) VALUES ",
        target.qualified_table(),
        columns.join(", ")
    );

    let mut sql = String::with_capacity(header.len() + rows * width * 6 + 24);
    sql.push_str(&header);

    let mut param = 0;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..width {
            if col > 0 {
                sql.push_str(", ");
            }
            param += 1;
            let _ = write!(sql, "${param}");
        }
        sql.push(')');
    }

    sql.push_str(" ON CONFLICT DO NOTHING");
    sql
}
