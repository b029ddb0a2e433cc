//! Condition: comparisons, membership, null checks, ranges, pattern matches
//! and their boolean combinators.

use crate::error::{Result, VaultError};
use crate::schema::Column;
use crate::value::Value;

use super::operand::Operand;
use super::Clause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl ComparisonOperator {
    fn token(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "<=>",
            ComparisonOperator::Ne => "<>",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combiner {
    And,
    Or,
    Xor,
}

impl Combiner {
    fn token(self) -> &'static str {
        match self {
            Combiner::And => "AND",
            Combiner::Or => "OR",
            Combiner::Xor => "XOR",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Condition {
    Comparison {
        left: Operand,
        op: ComparisonOperator,
        right: Operand,
    },
    In {
        probe: Operand,
        items: Vec<Operand>,
    },
    IsNull {
        column: Column,
    },
    Between {
        probe: Operand,
        lo: Operand,
        hi: Operand,
        inverted: bool,
    },
    Like {
        column: Column,
        pattern: Value,
    },
    LikeColumn {
        pattern: Value,
        prefix: String,
        column: Column,
        suffix: String,
    },
    Not(Box<Condition>),
    Combined {
        combiner: Combiner,
        children: Vec<Condition>,
    },
}

/// Renders one side of a binary comparison, returning `(sql_fragment, cast_value)`.
/// `column_side` is the datatype to cast a `Value` operand to, if the other
/// side is a column; `None` when both sides are values (no cast target).
fn render_operand(operand: &Operand, cast_to: Option<crate::value::DataType>) -> Result<(String, Option<Value>)> {
    match operand {
        Operand::Column(c) => Ok((c.qualified_name(), None)),
        Operand::Value(v) => {
            let cast = match cast_to {
                Some(dt) => v.clone().cast_to(dt)?,
                None => v.clone(),
            };
            Ok(("?".to_string(), Some(cast)))
        }
    }
}

impl Condition {
    pub fn comparison(left: impl Into<Operand>, op: ComparisonOperator, right: impl Into<Operand>) -> Self {
        Condition::Comparison { left: left.into(), op, right: right.into() }
    }

    pub fn is_null(column: Column) -> Self {
        Condition::IsNull { column }
    }

    pub fn like(column: Column, pattern: Value) -> Self {
        Condition::Like { column, pattern }
    }

    pub fn like_column(pattern: Value, prefix: impl Into<String>, column: Column, suffix: impl Into<String>) -> Self {
        Condition::LikeColumn { pattern, prefix: prefix.into(), column, suffix: suffix.into() }
    }

    pub fn between(probe: impl Into<Operand>, lo: impl Into<Operand>, hi: impl Into<Operand>) -> Self {
        Condition::Between { probe: probe.into(), lo: lo.into(), hi: hi.into(), inverted: false }
    }

    pub fn not_between(probe: impl Into<Operand>, lo: impl Into<Operand>, hi: impl Into<Operand>) -> Self {
        Condition::Between { probe: probe.into(), lo: lo.into(), hi: hi.into(), inverted: true }
    }

    pub fn in_list(probe: impl Into<Operand>, items: Vec<Operand>) -> Self {
        Condition::In { probe: probe.into(), items }
    }

    pub fn not(child: Condition) -> Self {
        Condition::Not(Box::new(child))
    }

    /// Builds a boolean combination. Empty `children` is a construction-time
    /// error; a single child collapses to that child unchanged; `Xor`
    /// requires exactly two children.
    pub fn combined(combiner: Combiner, children: Vec<Condition>) -> Result<Self> {
        if children.is_empty() {
            return Err(VaultError::clause("empty Combined condition has no children"));
        }
        if combiner == Combiner::Xor && children.len() != 2 {
            return Err(VaultError::clause(format!(
                "XOR condition requires exactly 2 children, got {}",
                children.len()
            )));
        }
        Ok(Condition::Combined { combiner, children })
    }
}

impl Clause for Condition {
    fn render(&self) -> Result<(String, Vec<Value>)> {
        match self {
            Condition::Comparison { left, op, right } => {
                if *op != ComparisonOperator::Eq && (left.is_null_value() || right.is_null_value()) {
                    return Err(VaultError::clause(format!(
                        "operator {:?} cannot be applied to a null value",
                        op
                    )));
                }
                let cast_target = match (left.as_column(), right.as_column()) {
                    (Some(c), _) => Some(c.datatype()),
                    (None, Some(c)) => Some(c.datatype()),
                    (None, None) => None,
                };
                let (left_sql, left_value) = render_operand(left, if left.as_column().is_none() { cast_target } else { None })?;
                let (right_sql, right_value) = render_operand(right, if right.as_column().is_none() { cast_target } else { None })?;
                let mut values = Vec::new();
                values.extend(left_value);
                values.extend(right_value);
                Ok((format!("{} {} {}", left_sql, op.token(), right_sql), values))
            }

            Condition::In { probe, items } => {
                let probe_datatype = probe.as_column().map(|c| c.datatype());
                let (probe_sql, probe_value) = render_operand(probe, None)?;
                let mut values = Vec::new();
                values.extend(probe_value);
                if items.is_empty() {
                    return Ok(("0".to_string(), values));
                }
                let mut item_sqls = Vec::with_capacity(items.len());
                for item in items {
                    let (sql, value) = render_operand(item, probe_datatype)?;
                    item_sqls.push(sql);
                    values.extend(value);
                }
                Ok((format!("{} IN ({})", probe_sql, item_sqls.join(", ")), values))
            }

            Condition::IsNull { column } => Ok((format!("{} IS NULL", column.qualified_name()), Vec::new())),

            Condition::Between { probe, lo, hi, inverted } => {
                let datatype = probe
                    .as_column()
                    .or_else(|| lo.as_column())
                    .or_else(|| hi.as_column())
                    .map(|c| c.datatype());
                let (probe_sql, probe_value) = render_operand(probe, if probe.as_column().is_none() { datatype } else { None })?;
                let (lo_sql, lo_value) = render_operand(lo, if lo.as_column().is_none() { datatype } else { None })?;
                let (hi_sql, hi_value) = render_operand(hi, if hi.as_column().is_none() { datatype } else { None })?;
                let mut values = Vec::new();
                values.extend(probe_value);
                values.extend(lo_value);
                values.extend(hi_value);
                let keyword = if *inverted { "NOT BETWEEN" } else { "BETWEEN" };
                Ok((format!("{} {} {} AND {}", probe_sql, keyword, lo_sql, hi_sql), values))
            }

            Condition::Like { column, pattern } => {
                if pattern.is_null() {
                    return Err(VaultError::clause("LIKE pattern cannot be null"));
                }
                let cast = pattern.clone().cast_to(column.datatype())?;
                Ok((format!("{} LIKE ?", column.qualified_name()), vec![cast]))
            }

            Condition::LikeColumn { pattern, prefix, column, suffix } => {
                if pattern.is_null() {
                    return Err(VaultError::clause("LIKE pattern cannot be null"));
                }
                Ok((
                    format!(
                        "? LIKE CONCAT('{}', {}, '{}')",
                        prefix.replace('\'', "''"),
                        column.qualified_name(),
                        suffix.replace('\'', "''")
                    ),
                    vec![pattern.clone()],
                ))
            }

            Condition::Not(child) => {
                let (sql, values) = child.render()?;
                Ok((format!("NOT ({})", sql), values))
            }

            Condition::Combined { combiner, children } => {
                let mut rendered_sqls = Vec::with_capacity(children.len());
                let mut values = Vec::new();
                for child in children {
                    let (sql, child_values) = child.render()?;
                    rendered_sqls.push(sql);
                    values.extend(child_values);
                }
                if rendered_sqls.len() == 1 {
                    return Ok((rendered_sqls.remove(0), values));
                }
                Ok((format!("({})", rendered_sqls.join(&format!(" {} ", combiner.token()))), values))
            }
        }
    }
}
