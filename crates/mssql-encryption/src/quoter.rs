//! T-SQL identifier and literal quoting.
//!
//! Used when statement text has to be synthesized around caller-supplied
//! names, such as the `EXEC` form of a stored procedure call.

use mssql_types::SqlValue;

use crate::error::{Error, Result};

/// A literal that may be rendered into statement text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuoteValue<'a> {
    /// Unicode string.
    NVarChar(&'a str),
    /// Narrow string.
    VarChar(&'a str),
    /// Narrow `varchar(max)` string.
    VarCharMax(&'a str),
    /// Unicode `nvarchar(max)` string.
    NVarCharMax(&'a str),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Raw bytes.
    Binary(&'a [u8]),
    /// SQL `NULL`.
    Null,
    /// Any other value kind, by SQL type name.
    Other(&'static str),
}

impl QuoteValue<'_> {
    /// Literal kind, for error reporting.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NVarChar(_) => "nvarchar",
            Self::VarChar(_) => "varchar",
            Self::VarCharMax(_) => "varchar(max)",
            Self::NVarCharMax(_) => "nvarchar(max)",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Binary(_) => "binary",
            Self::Null => "null",
            Self::Other(name) => *name,
        }
    }
}

impl<'a> From<&'a str> for QuoteValue<'a> {
    fn from(s: &'a str) -> Self {
        Self::NVarChar(s)
    }
}

impl<'a> From<&'a SqlValue> for QuoteValue<'a> {
    fn from(value: &'a SqlValue) -> Self {
        match value {
            SqlValue::String(s) | SqlValue::Xml(s) => Self::NVarChar(s),
            SqlValue::Bool(b) => Self::Bool(*b),
            SqlValue::Binary(b) => Self::Binary(b),
            SqlValue::Float(f) => Self::Float(f64::from(*f)),
            SqlValue::Double(f) => Self::Float(*f),
            SqlValue::Null => Self::Null,
            other => other.as_i64().map_or(Self::Other(other.type_name()), Self::Int),
        }
    }
}

/// Bracket-quote an identifier, doubling any `]`.
///
/// Multi-part names are quoted as a single unit: `schema.table` becomes
/// `[schema.table]`.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('[');
    out.push_str(&name.replace(']', "]]"));
    out.push(']');
    out
}

/// Render a string literal in single quotes, doubling any `'`.
///
/// Only string kinds can be quoted; everything else is
/// [`Error::UnsupportedLiteral`].
pub fn quote_value(value: &QuoteValue<'_>) -> Result<String> {
    match value {
        QuoteValue::NVarChar(s)
        | QuoteValue::VarChar(s)
        | QuoteValue::VarCharMax(s)
        | QuoteValue::NVarCharMax(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            out.push_str(&s.replace('\'', "''"));
            out.push('\'');
            Ok(out)
        }
        other => Err(Error::UnsupportedLiteral(other.kind())),
    }
}
