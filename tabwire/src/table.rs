//! Tabular result types.
//!
//! A [`DataSet`] holds uniquely named [`DataTable`]s, each table declares its
//! [`DataColumn`]s and holds [`DataRow`]s keyed by those column names.
use std::fmt;

use crate::{
    common::reason_error,
    row::{DataRow, DecodeError, FromRow},
};

/// Column metadata.
///
/// Carried verbatim, the client never validates values against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataColumn {
    field_name: String,
    caption: String,
    type_name: String,
}

impl DataColumn {
    /// Create column where caption is the field name.
    pub fn new(field_name: impl Into<String>, type_name: impl Into<String>) -> DataColumn {
        let field_name = field_name.into();
        Self {
            caption: field_name.clone(),
            field_name,
            type_name: type_name.into(),
        }
    }

    /// Set display caption.
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Returns the field name, used as row lookup key.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Returns the display caption.
    pub fn display_caption(&self) -> &str {
        &self.caption
    }

    /// Returns the fully qualified source type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Named table of typed rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    name: String,
    columns: Vec<DataColumn>,
    rows: Vec<DataRow>,
}

impl DataTable {
    /// Create table without columns.
    pub fn new(name: impl Into<String>) -> DataTable {
        Self { name: name.into(), columns: Vec::new(), rows: Vec::new() }
    }

    /// Returns table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns in display order.
    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Returns `true` if table contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lookup column by field name.
    pub fn column(&self, field_name: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.field_name == field_name)
    }

    /// Declare new column.
    ///
    /// Returns error if column with the same field name already declared.
    pub fn add_column(&mut self, column: DataColumn) -> Result<(), TableError> {
        if self.column(&column.field_name).is_some() {
            return Err(TableError::new(format!(
                "duplicate column {:?} in table {:?}",
                column.field_name, self.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Builder variant of [`DataTable::add_column`].
    pub fn with_column(mut self, column: DataColumn) -> Result<Self, TableError> {
        self.add_column(column)?;
        Ok(self)
    }

    /// Append row.
    ///
    /// Returns error if row contains a column that is not declared.
    pub fn push_row(&mut self, row: DataRow) -> Result<(), TableError> {
        if let Some(undeclared) = row.columns().find(|name| self.column(name).is_none()) {
            return Err(TableError::new(format!(
                "column {undeclared:?} is not declared in table {:?}",
                self.name
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Consume table into its rows.
    pub fn into_rows(self) -> Vec<DataRow> {
        self.rows
    }

    /// Decode every row using [`FromRow`] implementation.
    pub fn decode_rows<R: FromRow>(self) -> Result<Vec<R>, DecodeError> {
        self.rows.into_iter().map(R::from_row).collect()
    }
}

/// Named collection of uniquely named tables.
///
/// An empty dataset signals "no result data", as opposed to an absent dataset
/// which signals that no dataset was produced at all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSet {
    name: String,
    tables: Vec<DataTable>,
}

impl DataSet {
    /// Create empty dataset.
    pub fn new(name: impl Into<String>) -> DataSet {
        Self { name: name.into(), tables: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[DataTable] {
        &self.tables
    }

    /// Returns `true` if dataset contains no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Lookup table by name.
    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Add table.
    ///
    /// Returns error if a table with the same name already exists.
    pub fn add_table(&mut self, table: DataTable) -> Result<(), TableError> {
        if self.table(&table.name).is_some() {
            return Err(TableError::new(format!(
                "duplicate table {:?} in dataset {:?}",
                table.name, self.name
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Builder variant of [`DataSet::add_table`].
    pub fn with_table(mut self, table: DataTable) -> Result<Self, TableError> {
        self.add_table(table)?;
        Ok(self)
    }

    /// Remove and return table by name.
    pub fn take_table(&mut self, name: &str) -> Option<DataTable> {
        let i = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(i))
    }

    /// Consume dataset into its tables.
    pub fn into_tables(self) -> Vec<DataTable> {
        self.tables
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} columns, {} rows)", self.name, self.columns.len(), self.rows.len())
    }
}

reason_error! {
    /// An error when table structure invariant is violated.
    pub struct TableError("invalid table");
}
