//! OrderBy: an ordered list of sort keys.

use crate::error::Result;
use crate::schema::Column;
use crate::value::Value;

use super::Clause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Asc
    }
}

impl Direction {
    fn token(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderByEntry {
    pub column: Column,
    pub direction: Direction,
}

impl OrderByEntry {
    pub fn new(column: Column, direction: Direction) -> Self {
        Self { column, direction }
    }

    /// Direction defaults to ascending when not specified.
    pub fn asc(column: Column) -> Self {
        Self { column, direction: Direction::Asc }
    }

    pub fn desc(column: Column) -> Self {
        Self { column, direction: Direction::Desc }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderBy {
    entries: Vec<OrderByEntry>,
}

impl OrderBy {
    pub fn new(entries: Vec<OrderByEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Clause for OrderBy {
    fn render(&self) -> Result<(String, Vec<Value>)> {
        if self.entries.is_empty() {
            return Ok((String::new(), Vec::new()));
        }
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{} {}", e.column.qualified_name(), e.direction.token()))
            .collect();
        Ok((format!(" ORDER BY {}", parts.join(", ")), Vec::new()))
    }
}
