use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::types::error::{Error, Result};
use crate::types::temporal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int,
    BigInt,
    Double,
    Varchar,
    Date,
    Timestamp,
}

impl DataType {
    pub fn from_sql(data_type: &sqlparser::ast::DataType) -> Result<DataType> {
        use sqlparser::ast::DataType as Sql;

        match data_type {
            Sql::Boolean => Ok(DataType::Boolean),
            Sql::Int(_) | Sql::Integer(_) | Sql::SmallInt(_) | Sql::TinyInt(_) => Ok(DataType::Int),
            Sql::BigInt(_) => Ok(DataType::BigInt),
            Sql::Float(_) | Sql::Real | Sql::Double | Sql::DoublePrecision => Ok(DataType::Double),
            Sql::Varchar(_) | Sql::Char(_) | Sql::Text => Ok(DataType::Varchar),
            Sql::Date => Ok(DataType::Date),
            Sql::Timestamp(..) | Sql::Datetime(_) => Ok(DataType::Timestamp),
            other if other.to_string().eq_ignore_ascii_case("STRING") => Ok(DataType::Varchar),
            other => Err(Error::Expression(format!(
                "Unsupported cast data type: {}",
                other
            ))),
        }
    }

    /// Name of the type as SQLite would declare it.
    pub fn sqlite_name(&self) -> &'static str {
        match self {
            DataType::Boolean | DataType::Int | DataType::BigInt => "INTEGER",
            DataType::Double => "REAL",
            DataType::Varchar | DataType::Date | DataType::Timestamp => "TEXT",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int => "INT",
            DataType::BigInt => "BIGINT",
            DataType::Double => "DOUBLE",
            DataType::Varchar => "VARCHAR",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Double(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Timestamp(_))
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Boolean),
            Value::Int(_) => Some(DataType::Int),
            Value::Long(_) => Some(DataType::BigInt),
            Value::Double(_) => Some(DataType::Double),
            Value::Str(_) => Some(DataType::Varchar),
            Value::Date(_) => Some(DataType::Date),
            Value::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Long(l) => *l != 0,
            Value::Double(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Dates widen to midnight; strings are parsed.
    pub fn to_timestamp(&self) -> Result<NaiveDateTime> {
        match self {
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::Timestamp(ts) => Ok(*ts),
            Value::Str(s) => temporal::parse_timestamp(s),
            _ => Err(Error::Expression(format!(
                "Expected a date or timestamp, got {}",
                self
            ))),
        }
    }

    /// Parses a textual cell according to a column type. Empty text is NULL.
    pub fn parse_as(text: &str, data_type: DataType) -> Result<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let invalid = || Error::Storage(format!("Cannot read '{}' as {}", text, data_type));
        match data_type {
            DataType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(Value::Bool(true)),
                "false" | "f" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            DataType::Int => text.trim().parse().map(Value::Int).map_err(|_| invalid()),
            DataType::BigInt => text.trim().parse().map(Value::Long).map_err(|_| invalid()),
            DataType::Double => text.trim().parse().map(Value::Double).map_err(|_| invalid()),
            DataType::Varchar => Ok(Value::Str(text.to_string())),
            DataType::Date => temporal::parse_date(text)
                .map(Value::Date)
                .map_err(|_| invalid()),
            DataType::Timestamp => temporal::parse_timestamp(text)
                .map(Value::Timestamp)
                .map_err(|_| invalid()),
        }
    }

    /// SQL comparison with numeric and temporal promotion. `None` when either
    /// side is NULL or the types do not compare.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
            (Value::Date(l), Value::Date(r)) => Some(l.cmp(r)),
            (l, r) if l.is_numeric() && r.is_numeric() => match (l.as_i64(), r.as_i64()) {
                (Some(l), Some(r)) => Some(l.cmp(&r)),
                _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
            },
            (l, r) if l.is_temporal() || r.is_temporal() => {
                let l = l.to_timestamp().ok()?;
                let r = r.to_timestamp().ok()?;
                Some(l.cmp(&r))
            }
            _ => None,
        }
    }

    /// Total order used by ORDER BY: NULLs sort greater than everything.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.to_string().cmp(&other.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) if ts.nanosecond() == 0 => {
                write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S"))
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_promotes() {
        assert_eq!(Value::Long(24).compare(&Value::Int(25)), Some(Ordering::Less));
        assert_eq!(Value::Int(2).compare(&Value::Double(2.0)), Some(Ordering::Equal));
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    }

    #[test]
    fn dates_compare_with_timestamps_and_strings() {
        let date = Value::parse_as("1995-07-06", DataType::Date).unwrap();
        let ts = Value::parse_as("1995-07-06 00:00:01", DataType::Timestamp).unwrap();
        assert_eq!(date.compare(&ts), Some(Ordering::Less));
        assert_eq!(date.compare(&Value::Str("1995-07-06".into())), Some(Ordering::Equal));
    }

    #[test]
    fn renders_temporal_values() {
        let ts = Value::parse_as("1995-12-10 02:06:17", DataType::Timestamp).unwrap();
        assert_eq!(ts.to_string(), "1995-12-10 02:06:17");
        let date = Value::parse_as("1995-07-06", DataType::Date).unwrap();
        assert_eq!(date.to_string(), "1995-07-06");
    }

    #[test]
    fn empty_text_reads_as_null() {
        assert_eq!(Value::parse_as("", DataType::BigInt).unwrap(), Value::Null);
        assert!(Value::parse_as("abc", DataType::BigInt).is_err());
    }
}
