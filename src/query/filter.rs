//! Filter expressions
//!
//! The public surface takes a two-token string `"<field> <operator>"` plus a
//! typed value. It is parsed once, when the filter is added, into a
//! [`Filter`]; evaluation never looks at the string again.

use crate::error::ValidationError;
use crate::schema::{ModelSchema, ID_FIELD};
use crate::types::{IndexKind, Value};

use std::fmt;
use std::str::FromStr;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
}

impl Operator {
    /// Operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
        }
    }
}

impl FromStr for Operator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "<" => Ok(Operator::Less),
            ">" => Ok(Operator::Greater),
            "<=" => Ok(Operator::LessOrEqual),
            ">=" => Ok(Operator::GreaterOrEqual),
            other => Err(ValidationError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A validated filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field_name: String,
    /// Store key of the field's index
    pub store_key: String,
    /// Comparison
    pub op: Operator,
    /// Index encoding of the field
    pub index_kind: IndexKind,
    /// Comparison value; its type matches the field's declared type
    pub value: Value,
    /// Filter on the reserved identifier field
    pub by_id: bool,
}

impl Filter {
    /// Parse and validate a filter against a model schema
    pub fn parse(
        schema: &ModelSchema,
        expr: &str,
        value: Value,
    ) -> Result<Self, ValidationError> {
        let (field, op) = split_expr(expr)?;
        if field == ID_FIELD {
            return Self::by_id(op, value);
        }

        let op: Operator = op.parse()?;
        let entry = schema
            .entry(field)
            .ok_or_else(|| ValidationError::UnknownField {
                model: schema.name().to_string(),
                field: field.to_string(),
            })?;
        if !entry.index_kind.is_indexed() {
            return Err(ValidationError::UnindexedField {
                model: schema.name().to_string(),
                field: field.to_string(),
            });
        }

        match value.field_type() {
            None => return Err(ValidationError::NilValue(field.to_string())),
            Some(actual) if actual != entry.field_type => {
                return Err(ValidationError::TypeMismatch {
                    field: field.to_string(),
                    expected: entry.field_type.name().to_string(),
                    actual: actual.name().to_string(),
                })
            },
            Some(_) => {},
        }

        Ok(Self {
            field_name: entry.field_name.clone(),
            store_key: entry.store_key.clone(),
            op,
            index_kind: entry.index_kind,
            value,
            by_id: false,
        })
    }

    fn by_id(op: &str, value: Value) -> Result<Self, ValidationError> {
        if op != "=" {
            return Err(ValidationError::IdOperator(op.to_string()));
        }
        if value.as_str().is_none() {
            return Err(ValidationError::IdValueType(value.type_name().to_string()));
        }
        Ok(Self {
            field_name: ID_FIELD.to_string(),
            store_key: ID_FIELD.to_string(),
            op: Operator::Equal,
            index_kind: IndexKind::None,
            value,
            by_id: true,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(filter {} {} {})", self.field_name, self.op, self.value)
    }
}

/// Split `"<field> <op>"`; exactly one space is allowed
fn split_expr(expr: &str) -> Result<(&str, &str), ValidationError> {
    let mut parts = expr.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(op), None) if !field.is_empty() && !op.is_empty() => Ok((field, op)),
        _ => Err(ValidationError::MalformedFilter(expr.to_string())),
    }
}
