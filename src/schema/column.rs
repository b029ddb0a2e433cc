//! Column (component C).
//!
//! A column never holds a back-reference to its owning table: it stores the
//! table's name and its own stable ordinal index, and a qualified name is
//! reconstructed by asking the table (see the Table::qualify associated
//! function below, and the Table <-> Column redesign note).

use crate::error::Result;
use crate::identifier::validate_identifier;
use crate::value::{DataType, Value};

/// A column's declared default, already cast to the column's datatype, or a
/// sentinel meaning "the server fills this in at insert time".
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    None,
    Value(Value),
    CurrentTimestamp,
}

/// A single reflected column. Created exactly once per table lifetime and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Column {
    table_name: String,
    index: usize,
    db_name: String,
    logical_name: String,
    datatype: DataType,
    nullable: bool,
    primary: bool,
    auto_increment: bool,
    default: ColumnDefault,
}

impl Column {
    /// Validates `table_name` and `db_name` as identifiers before
    /// construction; a malformed name is rejected here rather than
    /// discovered later when it is concatenated into SQL unescaped.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        table_name: impl Into<String>,
        index: usize,
        db_name: impl Into<String>,
        logical_name: impl Into<String>,
        datatype: DataType,
        nullable: bool,
        primary: bool,
        auto_increment: bool,
        default: ColumnDefault,
    ) -> Result<Self> {
        let table_name = table_name.into();
        let db_name = db_name.into();
        validate_identifier(&table_name)?;
        validate_identifier(&db_name)?;
        Ok(Self {
            table_name,
            index,
            db_name,
            logical_name: logical_name.into(),
            datatype,
            nullable,
            primary,
            auto_increment,
            default,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn primary(&self) -> bool {
        self.primary
    }

    pub fn auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn default(&self) -> &ColumnDefault {
        &self.default
    }

    /// True for columns that must carry a value on INSERT: not nullable, not
    /// auto-increment, and without a server-side default.
    pub fn required_in_insert(&self) -> bool {
        !self.nullable && !self.auto_increment && matches!(self.default, ColumnDefault::None)
    }

    /// `<table>.<column>`, qualified per the dialect's unquoted identifier
    /// policy.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table_name, self.db_name)
    }

    /// Returns whether `self` and `other` belong to the same owning table,
    /// compared by table name plus ordinal index (never by pointer
    /// identity, since columns never back-reference their table).
    pub fn same_identity(&self, other: &Column) -> bool {
        self.table_name.eq_ignore_ascii_case(&other.table_name) && self.index == other.index
    }
}
