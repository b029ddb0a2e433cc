//! Selection: the list of columns (or `*`/`NULL`) a query projects.

use crate::error::Result;
use crate::schema::Column;
use crate::value::Value;

use super::Clause;

#[derive(Debug, Clone)]
pub enum Selection {
    All,
    None,
    Columns(Vec<Column>),
}

impl Selection {
    /// Merges two selections for the same query. `All` absorbs everything
    /// else; otherwise columns accumulate, preserving insertion order and
    /// dropping any column from `b` that already has the same identity in
    /// `a`; `None` is the identity.
    pub fn combine(self, other: Selection) -> Selection {
        match (self, other) {
            (Selection::All, _) | (_, Selection::All) => Selection::All,
            (Selection::None, other) => other,
            (this, Selection::None) => this,
            (Selection::Columns(mut a), Selection::Columns(b)) => {
                for column in b {
                    if !a.iter().any(|existing| existing.same_identity(&column)) {
                        a.push(column);
                    }
                }
                Selection::Columns(a)
            }
        }
    }
}

impl Clause for Selection {
    fn render(&self) -> Result<(String, Vec<Value>)> {
        let sql = match self {
            Selection::All => "SELECT *".to_string(),
            Selection::None => "SELECT NULL".to_string(),
            Selection::Columns(columns) => {
                let names: Vec<String> = columns.iter().map(|c| c.qualified_name()).collect();
                format!("SELECT {}", names.join(", "))
            }
        };
        Ok((sql, Vec::new()))
    }
}
