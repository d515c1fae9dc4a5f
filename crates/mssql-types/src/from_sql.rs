//! Extracting Rust values from decoded [`SqlValue`]s.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::TypeError;
use crate::numeric::Numeric;
use crate::value::SqlValue;

/// Types that can be read out of a [`SqlValue`].
pub trait FromSql: Sized {
    /// Convert from a SQL value. NULL is an [`TypeError::UnexpectedNull`].
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from a SQL value, mapping NULL to `None`.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    match value {
        SqlValue::Null => TypeError::UnexpectedNull,
        other => TypeError::TypeMismatch {
            expected,
            actual: other.type_name().to_owned(),
        },
    }
}

macro_rules! from_sql_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromSql for $ty {
                fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
                    let wide = value.as_i64().ok_or_else(|| mismatch($name, value))?;
                    <$ty>::try_from(wide).map_err(|_| TypeError::OutOfRange { target_type: $name })
                }
            }
        )*
    };
}

from_sql_int! {
    u8 => "u8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            other => other
                .as_i64()
                .map(|v| v != 0)
                .ok_or_else(|| mismatch("bool", other)),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            other => Err(mismatch("f32", other)),
        }
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Numeric(n) => Ok(n.to_f64()),
            other => other.as_f64().ok_or_else(|| mismatch("f64", other)),
        }
    }
}

impl FromSql for Numeric {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Numeric(n) => Ok(*n),
            other => other
                .as_i64()
                .map(Numeric::from)
                .ok_or_else(|| mismatch("Numeric", other)),
        }
    }
}

#[cfg(feature = "decimal")]
impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Numeric::from_sql(value)
            .map_err(|e| match e {
                TypeError::TypeMismatch { actual, .. } => TypeError::TypeMismatch {
                    expected: "Decimal",
                    actual,
                },
                other => other,
            })?
            .try_into()
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromSql for Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(v) => Ok(v.clone()),
            other => Err(mismatch("Bytes", other)),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Bytes::from_sql(value).map(|b| b.to_vec())
    }
}

impl FromSql for Uuid {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Guid(v) => Ok(*v),
            SqlValue::String(s) => s.parse().map_err(|_| TypeError::TypeMismatch {
                expected: "Uuid",
                actual: format!("string {s:?}"),
            }),
            other => Err(mismatch("Uuid", other)),
        }
    }
}

impl FromSql for NaiveDate {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Date(v) => Ok(*v),
            SqlValue::DateTime(v) => Ok(v.date()),
            other => Err(mismatch("NaiveDate", other)),
        }
    }
}

impl FromSql for NaiveTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Time(v) => Ok(*v),
            SqlValue::DateTime(v) => Ok(v.time()),
            other => Err(mismatch("NaiveTime", other)),
        }
    }
}

impl FromSql for NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::DateTime(v) => Ok(*v),
            SqlValue::DateTimeOffset(v) => Ok(v.naive_utc()),
            other => Err(mismatch("NaiveDateTime", other)),
        }
    }
}

impl FromSql for DateTime<FixedOffset> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::DateTimeOffset(v) => Ok(*v),
            other => Err(mismatch("DateTime<FixedOffset>", other)),
        }
    }
}

impl FromSql for DateTime<Utc> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::DateTimeOffset(v) => Ok(v.with_timezone(&Utc)),
            SqlValue::DateTime(v) => Ok(DateTime::from_naive_utc_and_offset(*v, Utc)),
            other => Err(mismatch("DateTime<Utc>", other)),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}
