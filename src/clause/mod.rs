//! Clause algebra (component D): conditions, selections, joins, ordering and
//! value assignments, all sharing a to_sql/values contract.

mod assignment;
mod condition;
mod join;
mod operand;
mod order;
mod selection;

pub use assignment::{AssignmentSource, ValueAssignment};
pub use condition::{Combiner, ComparisonOperator, Condition};
pub use join::{Join, JoinKind};
pub use operand::Operand;
pub use order::{Direction, OrderBy, OrderByEntry};
pub use selection::Selection;

use crate::error::Result;
use crate::value::Value;

/// Shared clause contract: a SQL fragment with zero or more `?` placeholders,
/// and the exact ordered list of values to bind to them.
///
/// `to_sql` and `values` must stay consistent (same placeholder count); both
/// are implemented here in terms of a single `render`, so no implementor can
/// let the two drift apart.
pub trait Clause {
    fn render(&self) -> Result<(String, Vec<Value>)>;

    fn to_sql(&self) -> Result<String> {
        Ok(self.render()?.0)
    }

    fn values(&self) -> Result<Vec<Value>> {
        Ok(self.render()?.1)
    }
}

/// Quotes a value for debug rendering only — never used to build real SQL.
pub(crate) fn debug_literal(value: &Value) -> String {
    if value.is_null() {
        return "NULL".to_string();
    }
    format!("'{:?}'", value)
}

/// `toWhereClause`: empty child SQL stays empty; otherwise prepend `" WHERE "`.
pub fn to_where_clause(condition: &Condition) -> Result<String> {
    let sql = condition.to_sql()?;
    if sql.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", sql))
    }
}
