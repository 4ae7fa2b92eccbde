use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, Ident, UnaryOperator,
};

use crate::types::{
    error::{Error, Result},
    temporal::{self, TimeUnit},
    DataType, OutputSchema, Row, Value,
};

pub struct ExprEvaluator;

impl ExprEvaluator {
    /// Evaluates a WHERE predicate. NULL drops the row; anything that is not
    /// a boolean is an error.
    pub fn predicate(expr: &Expr, row: &Row, columns: &OutputSchema) -> Result<bool> {
        match Self::evaluate(expr, row, columns)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::Expression(format!(
                "WHERE condition must be boolean, found '{}'",
                other
            ))),
        }
    }

    pub fn evaluate(expr: &Expr, row: &Row, columns: &OutputSchema) -> Result<Value> {
        match expr {
            Expr::Nested(expr) => Self::evaluate(expr, row, columns),
            Expr::UnaryOp { op, expr } => Self::evaluate_unary_op(op, expr, row, columns),
            Expr::BinaryOp { left, op, right } => {
                let left = Self::evaluate(left, row, columns)?;
                let right = Self::evaluate(right, row, columns)?;

                Self::evaluate_binary_op(&left, op, &right)
            }
            Expr::Identifier(ident) => Self::evaluate_identifier(None, ident, row, columns),
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [.., relation, column] => {
                    Self::evaluate_identifier(Some(&relation.value), column, row, columns)
                }
                [column] => Self::evaluate_identifier(None, column, row, columns),
                [] => Err(Error::Expression("Empty identifier".to_string())),
            },
            Expr::Value(value) => Self::evaluate_value(value),
            Expr::TypedString { data_type, value } => {
                Caster::cast(&Value::Str(value.clone()), DataType::from_sql(data_type)?)
            }
            Expr::Cast {
                expr, data_type, ..
            } => {
                let value = Self::evaluate(expr, row, columns)?;
                Caster::cast(&value, DataType::from_sql(data_type)?)
            }
            Expr::IsNull(expr) => Ok(Value::Bool(Self::evaluate(expr, row, columns)?.is_null())),
            Expr::IsNotNull(expr) => {
                Ok(Value::Bool(!Self::evaluate(expr, row, columns)?.is_null()))
            }
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let value = Self::evaluate(expr, row, columns)?;
                let low = Self::evaluate(low, row, columns)?;
                let high = Self::evaluate(high, row, columns)?;
                let above = Self::evaluate_binary_op(&value, &BinaryOperator::GtEq, &low)?;
                let below = Self::evaluate_binary_op(&value, &BinaryOperator::LtEq, &high)?;
                let within = Self::evaluate_binary_op(&above, &BinaryOperator::And, &below)?;
                match within {
                    Value::Bool(b) if *negated => Ok(Value::Bool(!b)),
                    other => Ok(other),
                }
            }
            Expr::Function(function) => Self::evaluate_function(function, row, columns),
            _ => Err(Error::Expression(format!(
                "Unsupported expression: {}",
                expr
            ))),
        }
    }

    pub fn evaluate_identifier(
        relation: Option<&str>,
        ident: &Ident,
        row: &Row,
        output_schema: &OutputSchema,
    ) -> Result<Value> {
        let index = output_schema
            .resolve(relation, &ident.value)
            .map_err(|e| Error::Expression(e.to_string()))?;
        row.get(index).cloned().ok_or_else(|| {
            Error::Execution(format!(
                "Row has {} values but column '{}' is at {}",
                row.len(),
                ident.value,
                index
            ))
        })
    }

    pub fn evaluate_unary_op(
        op: &UnaryOperator,
        expr: &Expr,
        row: &Row,
        columns: &OutputSchema,
    ) -> Result<Value> {
        let value = Self::evaluate(expr, row, columns)?;
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOperator::Not, value) => Ok(Value::Bool(!value.to_boolean())),
            (UnaryOperator::Plus, value) if value.is_numeric() => Ok(value),
            (UnaryOperator::Minus, Value::Int(i)) => Ok(i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Long(-(i as i64)))),
            (UnaryOperator::Minus, Value::Long(l)) => l
                .checked_neg()
                .map(Value::Long)
                .ok_or_else(|| Error::Execution(format!("Numeric overflow in -{}", l))),
            (UnaryOperator::Minus, Value::Double(d)) => Ok(Value::Double(-d)),
            (op, value) => Err(Error::Expression(format!(
                "Unsupported unary operation: {} {}",
                op, value
            ))),
        }
    }

    pub fn evaluate_binary_op(left: &Value, op: &BinaryOperator, right: &Value) -> Result<Value> {
        match op {
            BinaryOperator::And => Ok(Self::logical(left, right, false)),
            BinaryOperator::Or => Ok(Self::logical(left, right, true)),
            _ if left.is_null() || right.is_null() => Ok(Value::Null),
            BinaryOperator::Plus => BinaryOpEvaluator::add(left, right),
            BinaryOperator::Minus => BinaryOpEvaluator::subtract(left, right),
            BinaryOperator::Multiply => BinaryOpEvaluator::multiply(left, right),
            BinaryOperator::Divide => BinaryOpEvaluator::divide(left, right),
            BinaryOperator::Modulo => BinaryOpEvaluator::modulo(left, right),
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => BinaryOpEvaluator::compare(left, op, right),
            _ => Err(Error::Expression(format!(
                "Binary operation {} not supported",
                op
            ))),
        }
    }

    /// Three-valued AND (`short_circuit == false`) and OR (`true`).
    fn logical(left: &Value, right: &Value, short_circuit: bool) -> Value {
        let left = (!left.is_null()).then(|| left.to_boolean());
        let right = (!right.is_null()).then(|| right.to_boolean());
        match (left, right) {
            (Some(l), _) if l == short_circuit => Value::Bool(short_circuit),
            (_, Some(r)) if r == short_circuit => Value::Bool(short_circuit),
            (Some(_), Some(_)) => Value::Bool(!short_circuit),
            _ => Value::Null,
        }
    }

    pub fn evaluate_value(value: &sqlparser::ast::Value) -> Result<Value> {
        match value {
            sqlparser::ast::Value::Number(n, _b) => {
                if let Ok(i) = n.parse::<i32>() {
                    Ok(Value::Int(i))
                } else if let Ok(l) = n.parse::<i64>() {
                    Ok(Value::Long(l))
                } else if let Ok(d) = n.parse::<f64>() {
                    Ok(Value::Double(d))
                } else {
                    Err(Error::Expression(format!("Unable to parse Number {}", n)))
                }
            }
            sqlparser::ast::Value::Boolean(b) => Ok(Value::Bool(*b)),
            sqlparser::ast::Value::SingleQuotedString(s)
            | sqlparser::ast::Value::DoubleQuotedString(s) => Ok(Value::Str(s.to_string())),
            sqlparser::ast::Value::Null => Ok(Value::Null),
            _ => Err(Error::Expression(format!("Unsupported value: {}", value))),
        }
    }

    fn evaluate_function(function: &Function, row: &Row, columns: &OutputSchema) -> Result<Value> {
        let name = function.name.to_string().to_uppercase();
        let args = function
            .args
            .iter()
            .map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => Ok(expr),
                _ => Err(Error::Expression(format!(
                    "Unsupported argument {} to {}",
                    arg, name
                ))),
            })
            .collect::<Result<Vec<&Expr>>>()?;

        match (name.as_str(), args.as_slice()) {
            ("TIMESTAMPADD", [unit, amount, operand]) => {
                let unit = Self::time_unit(unit)?;
                let amount = Self::evaluate(amount, row, columns)?;
                let operand = Self::evaluate(operand, row, columns)?;
                TemporalFunctions::timestamp_add(unit, &amount, &operand)
            }
            ("TIMESTAMPDIFF", [unit, start, end]) => {
                let unit = Self::time_unit(unit)?;
                let start = Self::evaluate(start, row, columns)?;
                let end = Self::evaluate(end, row, columns)?;
                TemporalFunctions::timestamp_diff(unit, &start, &end)
            }
            ("TIMESTAMPADD" | "TIMESTAMPDIFF", _) => Err(Error::Expression(format!(
                "{} expects 3 arguments, got {}",
                name,
                args.len()
            ))),
            _ => Err(Error::Expression(format!("Unsupported function: {}", name))),
        }
    }

    /// The unit argument is a bare keyword (`DAY`) or a string (`'day'`).
    fn time_unit(expr: &Expr) -> Result<TimeUnit> {
        match expr {
            Expr::Identifier(ident) => ident.value.parse(),
            Expr::Value(sqlparser::ast::Value::SingleQuotedString(s)) => s.parse(),
            _ => Err(Error::Expression(format!("Invalid time unit: {}", expr))),
        }
    }
}

pub struct TemporalFunctions;

impl TemporalFunctions {
    /// DATE in, DATE out for day-or-coarser units; TIMESTAMP otherwise.
    pub fn timestamp_add(unit: TimeUnit, amount: &Value, operand: &Value) -> Result<Value> {
        if amount.is_null() || operand.is_null() {
            return Ok(Value::Null);
        }
        let amount = amount.as_i64().ok_or_else(|| {
            Error::Expression(format!("TIMESTAMPADD amount must be an integer, got {}", amount))
        })?;

        match operand {
            Value::Date(date) if unit.is_date_granular() => {
                Ok(Value::Date(temporal::add_to_date(unit, amount, *date)?))
            }
            other => Ok(Value::Timestamp(temporal::add(
                unit,
                amount,
                other.to_timestamp()?,
            )?)),
        }
    }

    pub fn timestamp_diff(unit: TimeUnit, start: &Value, end: &Value) -> Result<Value> {
        if start.is_null() || end.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Long(temporal::diff(
            unit,
            start.to_timestamp()?,
            end.to_timestamp()?,
        )?))
    }
}

pub struct BinaryOpEvaluator;

/// Operands lifted to a common numeric representation.
enum Numeric {
    Int(i32, i32),
    Long(i64, i64),
    Double(f64, f64),
}

impl BinaryOpEvaluator {
    fn numeric(left: &Value, op: &str, right: &Value) -> Result<Numeric> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Numeric::Int(*l, *r)),
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                match (left.as_f64(), right.as_f64()) {
                    (Some(l), Some(r)) => Ok(Numeric::Double(l, r)),
                    _ => Err(Self::unsupported(left, op, right)),
                }
            }
            _ => match (left.as_i64(), right.as_i64()) {
                (Some(l), Some(r)) => Ok(Numeric::Long(l, r)),
                _ => Err(Self::unsupported(left, op, right)),
            },
        }
    }

    fn unsupported(left: &Value, op: &str, right: &Value) -> Error {
        Error::Expression(format!(
            "Unsupported binary operation: {} {} {}",
            left, op, right
        ))
    }

    fn overflow(left: &Value, op: &str, right: &Value) -> Error {
        Error::Execution(format!("Numeric overflow in {} {} {}", left, op, right))
    }

    fn add(left: &Value, right: &Value) -> Result<Value> {
        if let (Value::Str(l), Value::Str(r)) = (left, right) {
            return Ok(Value::Str(format!("{}{}", l, r)));
        }
        match Self::numeric(left, "+", right)? {
            Numeric::Int(l, r) => Ok(l
                .checked_add(r)
                .map(Value::Int)
                .unwrap_or(Value::Long(l as i64 + r as i64))),
            Numeric::Long(l, r) => l
                .checked_add(r)
                .map(Value::Long)
                .ok_or_else(|| Self::overflow(left, "+", right)),
            Numeric::Double(l, r) => Ok(Value::Double(l + r)),
        }
    }

    fn subtract(left: &Value, right: &Value) -> Result<Value> {
        match Self::numeric(left, "-", right)? {
            Numeric::Int(l, r) => Ok(l
                .checked_sub(r)
                .map(Value::Int)
                .unwrap_or(Value::Long(l as i64 - r as i64))),
            Numeric::Long(l, r) => l
                .checked_sub(r)
                .map(Value::Long)
                .ok_or_else(|| Self::overflow(left, "-", right)),
            Numeric::Double(l, r) => Ok(Value::Double(l - r)),
        }
    }

    fn multiply(left: &Value, right: &Value) -> Result<Value> {
        match Self::numeric(left, "*", right)? {
            Numeric::Int(l, r) => Ok(l
                .checked_mul(r)
                .map(Value::Int)
                .unwrap_or(Value::Long(l as i64 * r as i64))),
            Numeric::Long(l, r) => l
                .checked_mul(r)
                .map(Value::Long)
                .ok_or_else(|| Self::overflow(left, "*", right)),
            Numeric::Double(l, r) => Ok(Value::Double(l * r)),
        }
    }

    fn divide(left: &Value, right: &Value) -> Result<Value> {
        let division_by_zero = || Error::Execution("Division by zero".to_string());
        match Self::numeric(left, "/", right)? {
            Numeric::Int(_, 0) | Numeric::Long(_, 0) => Err(division_by_zero()),
            Numeric::Int(l, r) => Ok(l
                .checked_div(r)
                .map(Value::Int)
                .unwrap_or(Value::Long(l as i64 / r as i64))),
            Numeric::Long(l, r) => l
                .checked_div(r)
                .map(Value::Long)
                .ok_or_else(|| Self::overflow(left, "/", right)),
            Numeric::Double(_, r) if r == 0.0 => Err(division_by_zero()),
            Numeric::Double(l, r) => Ok(Value::Double(l / r)),
        }
    }

    fn modulo(left: &Value, right: &Value) -> Result<Value> {
        let division_by_zero = || Error::Execution("Division by zero".to_string());
        match Self::numeric(left, "%", right)? {
            Numeric::Int(_, 0) | Numeric::Long(_, 0) => Err(division_by_zero()),
            // MIN % -1 overflows in two's complement; the remainder is zero.
            Numeric::Int(l, r) => Ok(Value::Int(l.checked_rem(r).unwrap_or(0))),
            Numeric::Long(l, r) => Ok(Value::Long(l.checked_rem(r).unwrap_or(0))),
            Numeric::Double(_, r) if r == 0.0 => Err(division_by_zero()),
            Numeric::Double(l, r) => Ok(Value::Double(l % r)),
        }
    }

    fn compare(left: &Value, op: &BinaryOperator, right: &Value) -> Result<Value> {
        let ordering = left
            .compare(right)
            .ok_or_else(|| Self::unsupported(left, &op.to_string(), right))?;
        let result = match op {
            BinaryOperator::Eq => ordering.is_eq(),
            BinaryOperator::NotEq => ordering.is_ne(),
            BinaryOperator::Lt => ordering.is_lt(),
            BinaryOperator::LtEq => ordering.is_le(),
            BinaryOperator::Gt => ordering.is_gt(),
            BinaryOperator::GtEq => ordering.is_ge(),
            _ => return Err(Self::unsupported(left, &op.to_string(), right)),
        };
        Ok(Value::Bool(result))
    }
}

pub struct Caster {}

impl Caster {
    pub fn cast(value: &Value, data_type: DataType) -> Result<Value> {
        let invalid = || {
            Error::Expression(format!("Unable to cast {} to {}", value, data_type))
        };
        match (data_type, value) {
            (_, Value::Null) => Ok(Value::Null),
            (DataType::Boolean, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (DataType::Boolean, v) if v.is_numeric() => Ok(Value::Bool(v.to_boolean())),
            (DataType::Int, Value::Int(i)) => Ok(Value::Int(*i)),
            (DataType::Int, Value::Long(l)) => i32::try_from(*l).map(Value::Int).map_err(|_| invalid()),
            (DataType::Int, Value::Double(d)) => Ok(Value::Int(*d as i32)),
            (DataType::BigInt, Value::Double(d)) => Ok(Value::Long(*d as i64)),
            (DataType::BigInt, v) if v.is_numeric() => v.as_i64().map(Value::Long).ok_or_else(invalid),
            (DataType::Double, v) if v.is_numeric() => v.as_f64().map(Value::Double).ok_or_else(invalid),
            (DataType::Varchar, v) => Ok(Value::Str(v.to_string())),
            (DataType::Date, Value::Date(d)) => Ok(Value::Date(*d)),
            (DataType::Date, Value::Timestamp(ts)) => Ok(Value::Date(ts.date())),
            (DataType::Timestamp, Value::Date(_) | Value::Timestamp(_)) => {
                Ok(Value::Timestamp(value.to_timestamp()?))
            }
            (DataType::Date, Value::Str(s)) => temporal::parse_timestamp(s)
                .map(|ts| Value::Date(ts.date()))
                .map_err(|_| invalid()),
            (data_type, Value::Str(s)) => Value::parse_as(s, data_type).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SQLParser;
    use sqlparser::ast::{SelectItem, SetExpr, Statement};

    fn eval(sql_expr: &str) -> Result<Value> {
        let statements = SQLParser::new().parse(&format!("select {}", sql_expr))?;
        let Statement::Query(query) = &statements[0] else {
            panic!("expected a query");
        };
        let SetExpr::Select(select) = &*query.body else {
            panic!("expected a select");
        };
        let SelectItem::UnnamedExpr(expr) = &select.projection[0] else {
            panic!("expected an expression");
        };
        ExprEvaluator::evaluate(expr, &vec![], &OutputSchema::default())
    }

    #[test]
    fn timestampadd_on_dates_keeps_date_for_day_units() {
        assert_eq!(
            eval("TIMESTAMPADD(DAY, 92, date '1995-07-06')").unwrap().to_string(),
            "1995-10-06"
        );
        assert_eq!(
            eval("TIMESTAMPADD(HOUR, 78, date '1995-07-06')").unwrap().to_string(),
            "1995-07-09 06:00:00"
        );
        assert_eq!(
            eval("TIMESTAMPADD(SECOND, 16, date '1995-07-06')").unwrap().to_string(),
            "1995-07-06 00:00:16"
        );
    }

    #[test]
    fn timestampdiff_returns_bigint() {
        assert_eq!(
            eval("TIMESTAMPDIFF(DAY, date '1995-07-06', date '1995-02-06')").unwrap(),
            Value::Long(-150)
        );
        assert_eq!(
            eval("timestampdiff(MINUTE, TIMESTAMP '1995-03-06 10:50:00', TIMESTAMP '1995-12-03 19:50:00')")
                .unwrap(),
            Value::Long(392_220)
        );
    }

    #[test]
    fn temporal_functions_propagate_null() {
        assert_eq!(eval("TIMESTAMPADD(DAY, NULL, date '1995-07-06')").unwrap(), Value::Null);
        assert_eq!(eval("TIMESTAMPDIFF(DAY, NULL, date '1995-07-06')").unwrap(), Value::Null);
    }

    #[test]
    fn rejects_bad_units_and_arity() {
        assert!(eval("TIMESTAMPADD(FORTNIGHT, 1, date '1995-07-06')").is_err());
        assert!(eval("TIMESTAMPDIFF(DAY, date '1995-07-06')").is_err());
    }

    #[test]
    fn arithmetic_promotes_and_guards_division() {
        assert_eq!(eval("1 + 2.5").unwrap(), Value::Double(3.5));
        assert_eq!(eval("2147483647 + 1").unwrap(), Value::Long(2_147_483_648));
        assert!(matches!(eval("1 / 0"), Err(Error::Execution(_))));
        assert_eq!(eval("NULL + 1").unwrap(), Value::Null);
    }

    #[test]
    fn negation_widens_instead_of_overflowing() {
        assert_eq!(eval("-(-2147483647 - 1)").unwrap(), Value::Long(2_147_483_648));
        assert_eq!(eval("-(-2147483647)").unwrap(), Value::Int(2_147_483_647));
        assert!(matches!(
            eval("-(-9223372036854775807 - 1)"),
            Err(Error::Execution(e)) if e.contains("overflow")
        ));
    }

    #[test]
    fn min_over_minus_one_is_not_division_by_zero() {
        assert_eq!(eval("(-2147483647 - 1) / -1").unwrap(), Value::Long(2_147_483_648));
        assert_eq!(eval("(-2147483647 - 1) % -1").unwrap(), Value::Int(0));
        assert!(matches!(
            eval("(-9223372036854775807 - 1) / -1"),
            Err(Error::Execution(e)) if e.contains("overflow")
        ));
        assert!(matches!(
            eval("7 % 0"),
            Err(Error::Execution(e)) if e == "Division by zero"
        ));
    }

    #[test]
    fn predicates_must_be_boolean() {
        let columns = OutputSchema::default();
        let predicate = |sql: &str| {
            let statements = SQLParser::new().parse(&format!("select 1 where {}", sql)).unwrap();
            let Statement::Query(query) = &statements[0] else {
                panic!("expected a query");
            };
            let SetExpr::Select(select) = &*query.body else {
                panic!("expected a select");
            };
            ExprEvaluator::predicate(select.selection.as_ref().unwrap(), &vec![], &columns)
        };
        assert!(predicate("1 < 2").unwrap());
        assert!(!predicate("NULL = 1").unwrap());
        assert!(matches!(predicate("'abc'"), Err(Error::Expression(_))));
        assert!(matches!(predicate("1"), Err(Error::Expression(_))));
    }

    #[test]
    fn three_valued_logic() {
        assert_eq!(eval("NULL AND false").unwrap(), Value::Bool(false));
        assert_eq!(eval("NULL OR true").unwrap(), Value::Bool(true));
        assert_eq!(eval("NULL AND true").unwrap(), Value::Null);
        assert_eq!(eval("NULL < 1").unwrap(), Value::Null);
    }

    #[test]
    fn casts_between_temporal_types() {
        assert_eq!(
            eval("CAST(TIMESTAMP '1995-12-10 02:06:17' AS DATE)").unwrap().to_string(),
            "1995-12-10"
        );
        assert_eq!(
            eval("CAST(date '1995-12-10' AS TIMESTAMP)").unwrap().to_string(),
            "1995-12-10 00:00:00"
        );
        assert_eq!(eval("CAST('42' AS BIGINT)").unwrap(), Value::Long(42));
        assert!(eval("CAST('x' AS INT)").is_err());
    }
}
