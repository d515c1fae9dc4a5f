//! Converting Rust values into [`SqlValue`]s for parameters.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::error::TypeError;
use crate::numeric::Numeric;
use crate::value::SqlValue;

/// Types that can be bound as query parameters.
pub trait ToSql {
    /// Convert this value to a SQL value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// Upper-case SQL type name the value is sent as.
    fn sql_type(&self) -> &'static str;
}

macro_rules! to_sql_copy {
    ($($ty:ty => $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> Result<SqlValue, TypeError> {
                    Ok(SqlValue::$variant(*self))
                }

                fn sql_type(&self) -> &'static str {
                    $name
                }
            }
        )*
    };
}

to_sql_copy! {
    bool => Bool, "BIT";
    u8 => TinyInt, "TINYINT";
    i16 => SmallInt, "SMALLINT";
    i32 => Int, "INT";
    i64 => BigInt, "BIGINT";
    f32 => Float, "REAL";
    f64 => Double, "FLOAT";
    Numeric => Numeric, "DECIMAL";
    Uuid => Guid, "UNIQUEIDENTIFIER";
    NaiveDate => Date, "DATE";
    NaiveTime => Time, "TIME";
    NaiveDateTime => DateTime, "DATETIME2";
    DateTime<FixedOffset> => DateTimeOffset, "DATETIMEOFFSET";
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.to_owned()))
    }

    fn sql_type(&self) -> &'static str {
        "NVARCHAR"
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        self.as_str().to_sql()
    }

    fn sql_type(&self) -> &'static str {
        "NVARCHAR"
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> &'static str {
        "VARBINARY"
    }
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        self.as_slice().to_sql()
    }

    fn sql_type(&self) -> &'static str {
        "VARBINARY"
    }
}

impl ToSql for Bytes {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(self.clone()))
    }

    fn sql_type(&self) -> &'static str {
        "VARBINARY"
    }
}

#[cfg(feature = "decimal")]
impl ToSql for rust_decimal::Decimal {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Numeric(Numeric::from(*self)))
    }

    fn sql_type(&self) -> &'static str {
        "DECIMAL"
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }

    fn sql_type(&self) -> &'static str {
        self.type_name()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn sql_type(&self) -> &'static str {
        match self {
            Some(v) => v.sql_type(),
            None => "NULL",
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (*self).to_sql()
    }

    fn sql_type(&self) -> &'static str {
        (*self).sql_type()
    }
}
