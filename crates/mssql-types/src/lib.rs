//! # mssql-types
//!
//! Bit-exact encoding and decoding of SQL Server wire values, plus the
//! column-type reporting a result set exposes.
//!
//! ## Features
//!
//! - `decimal` (default): conversions between [`Numeric`] and
//!   `rust_decimal::Decimal`
//!
//! ## Type Mappings
//!
//! | SQL Server Type | Rust Type |
//! |-----------------|-----------|
//! | `BIT` | `bool` |
//! | `TINYINT` | `u8` |
//! | `SMALLINT` | `i16` |
//! | `INT` | `i32` |
//! | `BIGINT` | `i64` |
//! | `REAL` | `f32` |
//! | `FLOAT` | `f64` |
//! | `DECIMAL`/`NUMERIC`/`MONEY` | [`Numeric`] |
//! | `CHAR`/`VARCHAR`/`NCHAR`/`NVARCHAR` | `String` |
//! | `BINARY`/`VARBINARY`/`IMAGE` | `bytes::Bytes` |
//! | `DATE` | `chrono::NaiveDate` |
//! | `TIME` | `chrono::NaiveTime` |
//! | `DATETIME`/`DATETIME2`/`SMALLDATETIME` | `chrono::NaiveDateTime` |
//! | `DATETIMEOFFSET` | `chrono::DateTime<FixedOffset>` |
//! | `UNIQUEIDENTIFIER` | `uuid::Uuid` |
//!
//! ## Example
//!
//! ```rust
//! use mssql_types::{SqlValue, TypeCodec};
//! use tds_protocol::{TypeId, TypeInfo};
//!
//! let codec = TypeCodec::new();
//! let money = TypeInfo::fixed(TypeId::Money);
//! let value = codec.decode(&money, &[0, 0, 0, 0, 0x10, 0x27, 0, 0]).unwrap();
//! assert_eq!(value.as_numeric().unwrap().to_string(), "1.0000");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod decode;
pub mod encode;
pub mod error;
pub mod from_sql;
pub mod guid;
pub mod metadata;
pub mod numeric;
pub mod temporal;
pub mod to_sql;
pub mod value;

pub use codec::TypeCodec;
pub use decode::{decode, decode_ucs2, decode_value};
pub use encode::{encode, encode_value};
pub use error::TypeError;
pub use from_sql::FromSql;
pub use metadata::{
    ScanType, database_type_name, declare_value, declared_type, length, param_type_info,
    precision_scale, scan_type,
};
pub use numeric::Numeric;
pub use to_sql::ToSql;
pub use value::SqlValue;
