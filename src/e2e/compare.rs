//! Result comparison between the engine and a reference engine.
//!
//! Values are compared after canonicalisation: numbers of any width compare
//! as floats within a tolerance, dates and timestamps compare as instants
//! whether they arrive typed or as text, and column names are ignored.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::temporal;
use crate::types::{ResultSet, Value};

static TEMPORAL_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([ T]\d{2}:\d{2}:\d{2}(\.\d+)?)?$")
        .unwrap_or_else(|e| panic!("invalid temporal pattern: {}", e))
});

#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Sort both sides before comparing.
    pub worder: bool,
    /// Column sorted on first when `worder` is set.
    pub order_by: Option<String>,
    pub acceptable_difference: f64,
    /// Treat `acceptable_difference` as a fraction of the expected value.
    pub use_percentage: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            worder: true,
            order_by: None,
            acceptable_difference: 0.01,
            use_percentage: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub message: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Number(f64),
    Time(NaiveDateTime),
    Text(String),
    Null,
}

impl Cell {
    fn from_value(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Value::Date(_) | Value::Timestamp(_) => match value.to_timestamp() {
                Ok(ts) => Cell::Time(ts),
                Err(_) => Cell::Text(value.to_string()),
            },
            Value::Str(s) if TEMPORAL_TEXT.is_match(s) => match temporal::parse_timestamp(s) {
                Ok(ts) => Cell::Time(ts),
                Err(_) => Cell::Text(s.clone()),
            },
            Value::Str(s) => Cell::Text(s.clone()),
            number => Cell::Number(number.as_f64().unwrap_or(f64::NAN)),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Number(_) => 0,
            Cell::Time(_) => 1,
            Cell::Text(_) => 2,
            Cell::Null => 3,
        }
    }

    fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Number(l), Cell::Number(r)) => l.total_cmp(r),
            (Cell::Time(l), Cell::Time(r)) => l.cmp(r),
            (Cell::Text(l), Cell::Text(r)) => l.cmp(r),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn matches(&self, actual: &Cell, options: &CompareOptions) -> bool {
        match (self, actual) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Number(e), Cell::Number(a)) => within(*e, *a, options),
            (Cell::Number(e), Cell::Text(a)) | (Cell::Text(a), Cell::Number(e)) => a
                .trim()
                .parse::<f64>()
                .map_or(false, |a| within(*e, a, options)),
            (Cell::Time(e), Cell::Time(a)) => e == a,
            (Cell::Text(e), Cell::Text(a)) => e == a,
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Time(ts) => write!(f, "{}", ts),
            Cell::Text(s) => write!(f, "'{}'", s),
            Cell::Null => write!(f, "NULL"),
        }
    }
}

fn within(expected: f64, actual: f64, options: &CompareOptions) -> bool {
    if expected == actual {
        return true;
    }
    let difference = (expected - actual).abs();
    if options.use_percentage {
        if expected == 0.0 {
            return difference <= options.acceptable_difference;
        }
        difference / expected.abs() <= options.acceptable_difference
    } else {
        difference <= options.acceptable_difference
    }
}

fn canonical_rows(result: &ResultSet) -> Vec<Vec<Cell>> {
    result
        .rows()
        .map(|row| row.iter().map(Cell::from_value).collect())
        .collect()
}

fn sort_rows(rows: &mut [Vec<Cell>], first: Option<usize>) {
    rows.sort_by(|l, r| {
        let leading = match first {
            Some(index) => l[index].sort_cmp(&r[index]),
            None => Ordering::Equal,
        };
        leading.then_with(|| {
            l.iter()
                .zip(r.iter())
                .map(|(l, r)| l.sort_cmp(r))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    });
}

/// Checks `actual` against `expected`. Row order only matters when
/// `worder` is unset.
pub fn compare_results(
    expected: &ResultSet,
    actual: &ResultSet,
    options: &CompareOptions,
) -> Result<(), Mismatch> {
    let width = expected.output_schema.len();
    if width != actual.output_schema.len() {
        return Err(Mismatch {
            message: format!(
                "column count differs: expected {}, got {}",
                width,
                actual.output_schema.len()
            ),
        });
    }
    if expected.row_count() != actual.row_count() {
        return Err(Mismatch {
            message: format!(
                "row count differs: expected {}, got {}",
                expected.row_count(),
                actual.row_count()
            ),
        });
    }

    let mut expected_rows = canonical_rows(expected);
    let mut actual_rows = canonical_rows(actual);

    if options.worder {
        let first = options.order_by.as_deref().and_then(|name| {
            actual
                .output_schema
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name))
        });
        sort_rows(&mut expected_rows, first);
        sort_rows(&mut actual_rows, first);
    }

    for (index, (e_row, a_row)) in expected_rows.iter().zip(actual_rows.iter()).enumerate() {
        for (column, (e, a)) in e_row.iter().zip(a_row.iter()).enumerate() {
            if !e.matches(a, options) {
                return Err(Mismatch {
                    message: format!(
                        "row {} column {} ({}): expected {}, got {}",
                        index,
                        column,
                        actual.column_names()[column],
                        e,
                        a
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DataType, OutputSchema};

    fn result(names: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
        ResultSet::from_rows(
            OutputSchema::new(names.iter().map(|n| Column::untyped(n)).collect()),
            rows,
        )
    }

    fn date(text: &str) -> Value {
        Value::parse_as(text, DataType::Date).unwrap()
    }

    #[test]
    fn typed_dates_match_reference_text() {
        let expected = result(&["d"], vec![vec![Value::Str("1995-07-06".into())]]);
        let actual = result(&["EXPR$0"], vec![vec![date("1995-07-06")]]);
        assert!(compare_results(&expected, &actual, &CompareOptions::default()).is_ok());

        let ts = result(&["t"], vec![vec![Value::Str("1995-07-06 00:00:00".into())]]);
        assert!(compare_results(&ts, &actual, &CompareOptions::default()).is_ok());
    }

    #[test]
    fn numbers_compare_within_tolerance() {
        let expected = result(&["n"], vec![vec![Value::Long(272)]]);
        let close = result(&["n"], vec![vec![Value::Double(272.005)]]);
        let far = result(&["n"], vec![vec![Value::Double(272.5)]]);
        let options = CompareOptions::default();

        assert!(compare_results(&expected, &close, &options).is_ok());
        assert!(compare_results(&expected, &far, &options).is_err());

        let percentage = CompareOptions {
            use_percentage: true,
            ..CompareOptions::default()
        };
        assert!(compare_results(&expected, &far, &percentage).is_ok());
    }

    #[test]
    fn worder_ignores_row_order() {
        let expected = result(
            &["k", "v"],
            vec![
                vec![Value::Long(2), Value::Str("b".into())],
                vec![Value::Long(1), Value::Str("a".into())],
            ],
        );
        let actual = result(
            &["k", "v"],
            vec![
                vec![Value::Long(1), Value::Str("a".into())],
                vec![Value::Long(2), Value::Str("b".into())],
            ],
        );

        let sorted = CompareOptions {
            order_by: Some("v".into()),
            ..CompareOptions::default()
        };
        assert!(compare_results(&expected, &actual, &sorted).is_ok());

        let ordered = CompareOptions {
            worder: false,
            ..CompareOptions::default()
        };
        let mismatch = compare_results(&expected, &actual, &ordered).unwrap_err();
        assert!(mismatch.message.starts_with("row 0 column 0"));
    }

    #[test]
    fn reports_shape_differences() {
        let one = result(&["a"], vec![vec![Value::Null]]);
        let two = result(&["a", "b"], vec![vec![Value::Null, Value::Null]]);
        let empty = result(&["a"], vec![]);
        let options = CompareOptions::default();

        assert!(compare_results(&one, &two, &options)
            .unwrap_err()
            .message
            .contains("column count"));
        assert!(compare_results(&one, &empty, &options)
            .unwrap_err()
            .message
            .contains("row count"));
        assert!(compare_results(&one, &one, &options).is_ok());
    }
}
