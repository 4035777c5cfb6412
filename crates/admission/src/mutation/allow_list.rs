//! Closed set of columns a partial update may touch.

use crate::errors::MutationError;

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Compile-time list of mutable columns for one table.
///
/// Every name that can appear in generated SQL comes from here, never from
/// request data.
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    table: &'static str,
    id_column: &'static str,
    columns: &'static [&'static str],
    timestamp_column: &'static str,
}

impl AllowList {
    /// Declare the mutable `columns` of `table`.
    ///
    /// # Errors
    ///
    /// `InvalidColumn` if any name is not a plain identifier, if `columns`
    /// repeats a name, or if it contains the id or timestamp column.
    pub fn new(
        table: &'static str,
        id_column: &'static str,
        columns: &'static [&'static str],
        timestamp_column: &'static str,
    ) -> Result<Self, MutationError> {
        if !table.split('.').all(is_identifier) {
            return Err(MutationError::InvalidColumn(table.to_string()));
        }

        for name in [id_column, timestamp_column] {
            if !is_identifier(name) {
                return Err(MutationError::InvalidColumn(name.to_string()));
            }
        }

        for (position, column) in columns.iter().enumerate() {
            let repeated = columns
                .iter()
                .take(position)
                .any(|earlier| earlier == column);

            if !is_identifier(column)
                || repeated
                || *column == id_column
                || *column == timestamp_column
            {
                return Err(MutationError::InvalidColumn((*column).to_string()));
            }
        }

        Ok(Self {
            table,
            id_column,
            columns,
            timestamp_column,
        })
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn id_column(&self) -> &'static str {
        self.id_column
    }

    /// Mutable columns in declaration order.
    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    /// System-maintained last-modified column.
    pub fn timestamp_column(&self) -> &'static str {
        self.timestamp_column
    }

    /// The declared column matching `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&'static str> {
        self.columns.iter().copied().find(|column| *column == name)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    starts_well
        && name.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
