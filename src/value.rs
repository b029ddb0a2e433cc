//! Value & type bridge (component A): an ordered sum of primitive
//! SQL-compatible values, with casting between them driven by a static
//! conversion graph.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{ErrorContext, Result, VaultError};

/// The datatype tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Int,
    Long,
    Double,
    Bool,
    Date,
    Time,
    DateTime,
}

impl DataType {
    pub fn all() -> [DataType; 8] {
        [
            DataType::String,
            DataType::Int,
            DataType::Long,
            DataType::Double,
            DataType::Bool,
            DataType::Date,
            DataType::Time,
            DataType::DateTime,
        ]
    }
}

/// How faithfully a cast between two datatypes preserves information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionReliability {
    /// No information is lost or approximated.
    Perfect,
    /// The cast succeeds but may lose precision (e.g. Long -> Int truncation,
    /// Double -> Int rounding).
    Lossy,
    /// There is no sensible cast between these two datatypes.
    NoConversion,
}

/// An immutable, tagged SQL value.
///
/// A `Null(T)` carries the datatype it would have held, so that a null can be
/// cast between datatypes (the tag changes) without ever becoming non-null.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Null(DataType),
}

impl Value {
    /// The datatype tag of this value, null or not.
    pub fn datatype(&self) -> DataType {
        match self {
            Value::String(_) => DataType::String,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Double(_) => DataType::Double,
            Value::Bool(_) => DataType::Bool,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::DateTime(_) => DataType::DateTime,
            Value::Null(t) => *t,
        }
    }

    /// Constructs the null value of the given datatype.
    pub fn null_of(datatype: DataType) -> Value {
        Value::Null(datatype)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Casts this value to `target`. `cast_to(T)` on a value already of type
    /// `T` is the identity. Nulls cast freely: only the tag changes.
    pub fn cast_to(&self, target: DataType) -> Result<Value> {
        if self.datatype() == target {
            return Ok(self.clone());
        }
        if self.is_null() {
            return Ok(Value::Null(target));
        }
        if conversion_reliability(self.datatype(), target) == ConversionReliability::NoConversion {
            return Err(VaultError::clause(format!(
                "UncastableValue: cannot cast {:?} to {:?}",
                self.datatype(),
                target
            )));
        }
        cast_non_null(self, target)
    }

    /// Casts to whichever SQL-compatible datatype the conversion graph
    /// reaches with the best reliability (ties broken by `DataType::all()`
    /// order), i.e. "cast to any SQL-compatible type".
    pub fn cast_to_most_reliable(&self, candidates: &[DataType]) -> Result<Value> {
        let from = self.datatype();
        let mut best: Option<(ConversionReliability, DataType)> = None;
        for &target in candidates {
            let reliability = if target == from {
                ConversionReliability::Perfect
            } else {
                conversion_reliability(from, target)
            };
            if reliability == ConversionReliability::NoConversion {
                continue;
            }
            if best.map(|(r, _)| reliability < r).unwrap_or(true) {
                best = Some((reliability, target));
            }
        }
        match best {
            Some((_, target)) => self.cast_to(target),
            None => Err(VaultError::clause(format!(
                "UncastableValue: no SQL-compatible target reachable from {:?}",
                from
            ))),
        }
    }
}

/// Validates that `value` can be bound to a column declared as `target`,
/// without altering the value's own representation (the driver binds each
/// `Value` variant on its own terms; MySQL coerces on the server side).
/// Raises `ValueBindFailed` when the two datatypes have no conversion path
/// at all, naming the offending placeholder.
pub fn bind_to_column(value: &Value, target: DataType, placeholder_index: usize) -> Result<Value> {
    if !value.is_null()
        && value.datatype() != target
        && conversion_reliability(value.datatype(), target) == ConversionReliability::NoConversion
    {
        return Err(VaultError::ValueBindFailed {
            placeholder_index,
            message: format!(
                "cannot bind value of type {:?} to column of type {:?}: no conversion path",
                value.datatype(),
                target
            ),
            context: ErrorContext::new(),
        });
    }
    Ok(value.clone())
}

/// Static conversion-reliability graph. Symmetric entries are listed once;
/// lookups fall back to `NoConversion` for any unlisted pair.
fn conversion_reliability(from: DataType, to: DataType) -> ConversionReliability {
    use ConversionReliability::*;
    use DataType::*;
    match (from, to) {
        (Int, Long) | (Long, Int) => Perfect,
        (Int, Double) => Perfect,
        (Long, Double) => Lossy,
        (Double, Int) | (Double, Long) => Lossy,
        (Bool, Int) | (Int, Bool) => Perfect,
        (Bool, Long) | (Long, Bool) => Perfect,
        (String, Int) | (String, Long) | (String, Double) | (String, Bool) => Lossy,
        (Int, String) | (Long, String) | (Double, String) | (Bool, String) => Perfect,
        (Date, DateTime) => Perfect,
        (DateTime, Date) => Lossy,
        (Time, String) | (Date, String) | (DateTime, String) => Perfect,
        (String, Time) | (String, Date) | (String, DateTime) => Lossy,
        _ => NoConversion,
    }
}

fn cast_non_null(value: &Value, target: DataType) -> Result<Value> {
    use DataType::*;
    let fail = || {
        VaultError::clause(format!(
            "UncastableValue: cannot cast {:?} to {:?}",
            value.datatype(),
            target
        ))
    };
    Ok(match (value, target) {
        (Value::Int(v), Long) => Value::Long(*v as i64),
        (Value::Long(v), Int) => Value::Int(*v as i32),
        (Value::Int(v), Double) => Value::Double(*v as f64),
        (Value::Long(v), Double) => Value::Double(*v as f64),
        (Value::Double(v), Int) => Value::Int(*v as i32),
        (Value::Double(v), Long) => Value::Long(*v as i64),
        (Value::Bool(v), Int) => Value::Int(if *v { 1 } else { 0 }),
        (Value::Bool(v), Long) => Value::Long(if *v { 1 } else { 0 }),
        (Value::Int(v), Bool) => Value::Bool(*v != 0),
        (Value::Long(v), Bool) => Value::Bool(*v != 0),
        (Value::Int(v), String) => Value::String(v.to_string()),
        (Value::Long(v), String) => Value::String(v.to_string()),
        (Value::Double(v), String) => Value::String(v.to_string()),
        (Value::Bool(v), String) => Value::String(v.to_string()),
        (Value::Date(v), String) => Value::String(v.to_string()),
        (Value::Time(v), String) => Value::String(v.to_string()),
        (Value::DateTime(v), String) => Value::String(v.to_string()),
        (Value::Date(v), DateTime) => Value::DateTime(v.and_hms_opt(0, 0, 0).ok_or_else(fail)?),
        (Value::DateTime(v), Date) => Value::Date(v.date()),
        (Value::String(s), Int) => Value::Int(s.parse::<i32>().map_err(|_| fail())?),
        (Value::String(s), Long) => Value::Long(s.parse::<i64>().map_err(|_| fail())?),
        (Value::String(s), Double) => Value::Double(s.parse::<f64>().map_err(|_| fail())?),
        (Value::String(s), Bool) => Value::Bool(match s.to_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return Err(fail()),
        }),
        (Value::String(s), Date) => {
            Value::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| fail())?)
        }
        (Value::String(s), Time) => {
            Value::Time(NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| fail())?)
        }
        (Value::String(s), DateTime) => Value::DateTime(
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map_err(|_| fail())?,
        ),
        _ => return Err(fail()),
    })
}

/// Converts a value to the raw representation the `mysql` driver binds as a
/// statement parameter.
pub fn to_driver_value(value: &Value) -> mysql::Value {
    use mysql::Value as MV;
    match value {
        Value::String(s) => MV::Bytes(s.clone().into_bytes()),
        Value::Int(i) => MV::Int(*i as i64),
        Value::Long(i) => MV::Int(*i),
        Value::Double(d) => MV::Double(*d),
        Value::Bool(b) => MV::Int(if *b { 1 } else { 0 }),
        Value::Date(d) => MV::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        Value::Time(t) => MV::Time(false, 0, t.hour() as u8, t.minute() as u8, t.second() as u8, 0),
        Value::DateTime(dt) => MV::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            0,
        ),
        Value::Null(_) => MV::NULL,
    }
}

/// Casts a raw driver value into `target`, or into `DataType::String` when
/// no known column matched the result-set column (the executor's fallback
/// for unrecognised projections).
pub fn from_driver_value(raw: mysql::Value, target: DataType) -> Result<Value> {
    use mysql::Value as MV;
    if matches!(raw, MV::NULL) {
        return Ok(Value::Null(target));
    }
    Ok(match (raw, target) {
        (MV::Int(i), DataType::Int) => Value::Int(i as i32),
        (MV::Int(i), DataType::Long) => Value::Long(i),
        (MV::Int(i), DataType::Bool) => Value::Bool(i != 0),
        (MV::Int(i), DataType::Double) => Value::Double(i as f64),
        (MV::UInt(i), DataType::Int) => Value::Int(i as i32),
        (MV::UInt(i), DataType::Long) => Value::Long(i as i64),
        (MV::UInt(i), DataType::Bool) => Value::Bool(i != 0),
        (MV::Float(f), DataType::Double) => Value::Double(f as f64),
        (MV::Double(d), DataType::Double) => Value::Double(d),
        (MV::Double(d), DataType::Int) => Value::Int(d as i32),
        (MV::Double(d), DataType::Long) => Value::Long(d as i64),
        (MV::Bytes(bytes), DataType::String) => {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        (MV::Bytes(bytes), DataType::Int) => {
            let s = String::from_utf8_lossy(&bytes);
            Value::Int(s.parse().map_err(|_| {
                VaultError::clause(format!("UncastableValue: driver bytes '{}' are not an Int", s))
            })?)
        }
        (MV::Bytes(bytes), DataType::Long) => {
            let s = String::from_utf8_lossy(&bytes);
            Value::Long(s.parse().map_err(|_| {
                VaultError::clause(format!("UncastableValue: driver bytes '{}' are not a Long", s))
            })?)
        }
        (MV::Bytes(bytes), DataType::Double) => {
            let s = String::from_utf8_lossy(&bytes);
            Value::Double(s.parse().map_err(|_| {
                VaultError::clause(format!("UncastableValue: driver bytes '{}' are not a Double", s))
            })?)
        }
        (MV::Bytes(bytes), DataType::Bool) => {
            let s = String::from_utf8_lossy(&bytes);
            Value::Bool(s == "1" || s.eq_ignore_ascii_case("true"))
        }
        (MV::Date(y, mo, d, h, mi, s, _), DataType::Date) => {
            Value::Date(NaiveDate::from_ymd_opt(y as i32, mo as u32, d as u32).ok_or_else(|| {
                VaultError::clause("UncastableValue: driver returned an invalid Date")
            })?)
        }
        (MV::Date(y, mo, d, h, mi, s, _), DataType::DateTime) => {
            let date = NaiveDate::from_ymd_opt(y as i32, mo as u32, d as u32).ok_or_else(|| {
                VaultError::clause("UncastableValue: driver returned an invalid DateTime")
            })?;
            Value::DateTime(
                date.and_hms_opt(h as u32, mi as u32, s as u32)
                    .ok_or_else(|| VaultError::clause("UncastableValue: driver returned an invalid DateTime"))?,
            )
        }
        (MV::Time(neg, days, h, mi, s, _), DataType::Time) if !neg && days == 0 => {
            Value::Time(NaiveTime::from_hms_opt(h as u32, mi as u32, s as u32).ok_or_else(|| {
                VaultError::clause("UncastableValue: driver returned an invalid Time")
            })?)
        }
        (other, target) => {
            return Err(VaultError::clause(format!(
                "UncastableValue: cannot interpret driver value {:?} as {:?}",
                other, target
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_cast() {
        let v = Value::Int(5);
        assert_eq!(v.cast_to(DataType::Int).unwrap(), v);
    }

    #[test]
    fn test_null_preserves_nullness_across_cast() {
        let v = Value::Null(DataType::Int);
        let cast = v.cast_to(DataType::String).unwrap();
        assert!(cast.is_null());
        assert_eq!(cast.datatype(), DataType::String);
    }

    #[test]
    fn test_lossy_double_to_int() {
        let v = Value::Double(3.9);
        assert_eq!(v.cast_to(DataType::Int).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_string_to_int_roundtrip() {
        let v = Value::String("42".to_string());
        assert_eq!(v.cast_to(DataType::Int).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_uncastable_pair_errors() {
        let v = Value::Time(NaiveTime::from_hms_opt(1, 2, 3).unwrap());
        assert!(v.cast_to(DataType::Int).is_err());
    }

    #[test]
    fn test_bad_numeric_string_errors() {
        let v = Value::String("not a number".to_string());
        assert!(v.cast_to(DataType::Int).is_err());
    }

    #[test]
    fn test_cast_to_most_reliable_prefers_perfect() {
        let v = Value::Bool(true);
        let cast = v
            .cast_to_most_reliable(&[DataType::Double, DataType::Int])
            .unwrap();
        assert_eq!(cast, Value::Int(1));
    }

    #[test]
    fn test_to_driver_value_null_is_driver_null() {
        assert_eq!(to_driver_value(&Value::Null(DataType::Int)), mysql::Value::NULL);
    }

    #[test]
    fn test_from_driver_value_null_preserves_target_type() {
        let v = from_driver_value(mysql::Value::NULL, DataType::String).unwrap();
        assert_eq!(v, Value::Null(DataType::String));
    }

    #[test]
    fn test_driver_roundtrip_string() {
        let v = Value::String("alice".to_string());
        let driver = to_driver_value(&v);
        let back = from_driver_value(driver, DataType::String).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_bind_to_column_passes_through_reliable_conversions_unaltered() {
        let bound = bind_to_column(&Value::Int(5), DataType::Long, 0).unwrap();
        assert_eq!(bound, Value::Int(5));
    }

    #[test]
    fn test_bind_to_column_fails_with_value_bind_failed_when_no_conversion() {
        let time = Value::Time(NaiveTime::from_hms_opt(1, 2, 3).unwrap());
        let err = bind_to_column(&time, DataType::Int, 3).unwrap_err();
        match err {
            VaultError::ValueBindFailed { placeholder_index, .. } => assert_eq!(placeholder_index, 3),
            other => panic!("expected ValueBindFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_driver_roundtrip_long() {
        let v = Value::Long(42);
        let driver = to_driver_value(&v);
        let back = from_driver_value(driver, DataType::Long).unwrap();
        assert_eq!(back, v);
    }
}
