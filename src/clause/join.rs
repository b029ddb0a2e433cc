//! Join: one joined table plus the ON condition linking it to the query.

use crate::error::Result;
use crate::schema::{ColumnInitialiser, Table, TableReferenceReader};
use crate::value::Value;

use super::condition::{Combiner, ComparisonOperator, Condition};
use super::operand::Operand;
use super::Clause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn token(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    joined_table: String,
    condition: Condition,
}

impl Join {
    pub fn new(kind: JoinKind, joined_table: impl Into<String>, condition: Condition) -> Self {
        Self { kind, joined_table: joined_table.into(), condition }
    }

    pub fn joined_table(&self) -> &str {
        &self.joined_table
    }

    /// Resolves the reference set between `this` and `other` via the schema;
    /// when more than one reference exists, OR-combines an equality condition
    /// per reference.
    pub fn from_tables(
        kind: JoinKind,
        this: &Table,
        other: &Table,
        column_init: &dyn ColumnInitialiser,
        ref_reader: &dyn TableReferenceReader,
    ) -> Result<Self> {
        let refs = this.references_to(column_init, ref_reader, other)?;
        let conditions: Vec<Condition> = refs
            .iter()
            .map(|r| {
                Condition::comparison(
                    Operand::Column(r.referencing_column().clone()),
                    ComparisonOperator::Eq,
                    Operand::Column(r.referenced_column().clone()),
                )
            })
            .collect();
        let condition = if conditions.len() == 1 {
            conditions.into_iter().next().unwrap()
        } else {
            Condition::combined(Combiner::Or, conditions)?
        };
        Ok(Self::new(kind, other.table_name().to_string(), condition))
    }
}

impl Clause for Join {
    fn render(&self) -> Result<(String, Vec<Value>)> {
        let (condition_sql, values) = self.condition.render()?;
        Ok((
            format!(" {} JOIN {} ON {}", self.kind.token(), self.joined_table, condition_sql),
            values,
        ))
    }
}
