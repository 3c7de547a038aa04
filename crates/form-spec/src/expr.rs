use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// Lightweight expression AST used by cross-field rule conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Literal { value: Value },
    Field { name: String },
    Present { name: String },
    Eq { left: Box<Expr>, right: Box<Expr> },
    Ne { left: Box<Expr>, right: Box<Expr> },
    Lt { left: Box<Expr>, right: Box<Expr> },
    Lte { left: Box<Expr>, right: Box<Expr> },
    Gt { left: Box<Expr>, right: Box<Expr> },
    Gte { left: Box<Expr>, right: Box<Expr> },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
    Not { expression: Box<Expr> },
}

impl Expr {
    /// Resolves the expression to a JSON value; `None` when an operand is
    /// missing from the record.
    fn resolve(&self, record: &Record) -> Option<Value> {
        match self {
            Expr::Literal { value } => Some(value.clone()),
            Expr::Field { name } => record.get(name).map(|value| value.to_value()),
            other => other.evaluate(record).map(Value::Bool),
        }
    }

    fn number_pair(left: &Expr, right: &Expr, record: &Record) -> Option<(f64, f64)> {
        let left = left.resolve(record)?.as_f64()?;
        let right = right.resolve(record)?.as_f64()?;
        Some((left, right))
    }

    /// Evaluates the expression to a boolean verdict if possible.
    pub fn evaluate(&self, record: &Record) -> Option<bool> {
        match self {
            Expr::Literal { value } => value.as_bool(),
            Expr::Field { name } => record.get(name).and_then(|value| value.as_bool()),
            Expr::Present { name } => {
                Some(record.get(name).is_some_and(|value| !value.is_empty()))
            }
            Expr::Eq { left, right } => {
                let left_val = left.resolve(record)?;
                let right_val = right.resolve(record)?;
                Some(left_val == right_val)
            }
            Expr::Ne { left, right } => {
                let left_val = left.resolve(record)?;
                let right_val = right.resolve(record)?;
                Some(left_val != right_val)
            }
            Expr::Lt { left, right } => {
                Self::number_pair(left, right, record).map(|(l, r)| l < r)
            }
            Expr::Lte { left, right } => {
                Self::number_pair(left, right, record).map(|(l, r)| l <= r)
            }
            Expr::Gt { left, right } => {
                Self::number_pair(left, right, record).map(|(l, r)| l > r)
            }
            Expr::Gte { left, right } => {
                Self::number_pair(left, right, record).map(|(l, r)| l >= r)
            }
            Expr::And { expressions } => {
                for expr in expressions {
                    match expr.evaluate(record) {
                        Some(true) => continue,
                        Some(false) => return Some(false),
                        None => return None,
                    }
                }
                Some(true)
            }
            Expr::Or { expressions } => {
                for expr in expressions {
                    if let Some(true) = expr.evaluate(record) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            Expr::Not { expression } => expression.evaluate(record).map(|value| !value),
        }
    }

    /// Collects every field name the expression reads.
    pub fn referenced_fields(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal { .. } => {}
            Expr::Field { name } | Expr::Present { name } => out.push(name.clone()),
            Expr::Eq { left, right }
            | Expr::Ne { left, right }
            | Expr::Lt { left, right }
            | Expr::Lte { left, right }
            | Expr::Gt { left, right }
            | Expr::Gte { left, right } => {
                left.referenced_fields(out);
                right.referenced_fields(out);
            }
            Expr::And { expressions } | Expr::Or { expressions } => {
                for expr in expressions {
                    expr.referenced_fields(out);
                }
            }
            Expr::Not { expression } => expression.referenced_fields(out),
        }
    }

    /// Equality between two fields' current values.
    pub fn fields_equal(left: impl Into<String>, right: impl Into<String>) -> Self {
        Expr::Eq {
            left: Box::new(Expr::Field { name: left.into() }),
            right: Box::new(Expr::Field { name: right.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use serde_json::json;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        let mut record = Record::new();
        for (name, value) in pairs {
            record.set(name.to_string(), value.clone());
        }
        record
    }

    #[test]
    fn eq_compares_field_values() {
        let record = record(&[
            ("a", FieldValue::Text("same".into())),
            ("b", FieldValue::Text("same".into())),
        ]);
        assert_eq!(Expr::fields_equal("a", "b").evaluate(&record), Some(true));
    }

    #[test]
    fn missing_operand_yields_no_verdict() {
        let record = record(&[("a", FieldValue::Text("x".into()))]);
        assert_eq!(Expr::fields_equal("a", "gone").evaluate(&record), None);
    }

    #[test]
    fn present_is_false_for_empty_values() {
        let record = record(&[("a", FieldValue::Text(String::new()))]);
        let expr = Expr::Present { name: "a".into() };
        assert_eq!(expr.evaluate(&record), Some(false));
    }

    #[test]
    fn numeric_comparison_uses_f64() {
        let record = record(&[("age", FieldValue::Number(21.0))]);
        let expr = Expr::Gte {
            left: Box::new(Expr::Field { name: "age".into() }),
            right: Box::new(Expr::Literal { value: json!(18) }),
        };
        assert_eq!(expr.evaluate(&record), Some(true));
    }

    #[test]
    fn and_short_circuits_on_false() {
        let record = Record::new();
        let expr = Expr::And {
            expressions: vec![
                Expr::Literal { value: json!(false) },
                Expr::Field { name: "never".into() },
            ],
        };
        assert_eq!(expr.evaluate(&record), Some(false));
    }

    #[test]
    fn serde_round_trips_tagged_ops() {
        let expr = Expr::Not {
            expression: Box::new(Expr::Present { name: "a".into() }),
        };
        let value = serde_json::to_value(&expr).expect("serialize");
        assert_eq!(value["op"], "not");
        assert_eq!(value["expression"]["op"], "present");
        let parsed: Expr = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, expr);
    }
}
