//! A comparable side of a condition: either a qualified column or a bound
//! value.

use crate::schema::Column;
use crate::value::{DataType, Value};

#[derive(Debug, Clone)]
pub enum Operand {
    Column(Column),
    Value(Value),
}

impl Operand {
    pub fn datatype(&self) -> DataType {
        match self {
            Operand::Column(c) => c.datatype(),
            Operand::Value(v) => v.datatype(),
        }
    }

    pub fn is_null_value(&self) -> bool {
        matches!(self, Operand::Value(v) if v.is_null())
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Operand::Column(c) => Some(c),
            Operand::Value(_) => None,
        }
    }
}

impl From<Column> for Operand {
    fn from(c: Column) -> Self {
        Operand::Column(c)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}
