//! Statement shaping for encrypted parameters.
//!
//! Before a statement with parameters is sent to an encryption-enabled
//! server, the client asks the server which parameters target encrypted
//! columns by calling `sp_describe_parameter_encryption` with the statement
//! text and its parameter declarations. The server answers with two result
//! sets: the column encryption keys involved, and one row per parameter.
//!
//! This module builds that request and turns the answer into
//! [`ParameterEncryptionInfo`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use bytes::Bytes;
use mssql_types::{SqlValue, declare_value};
use tds_protocol::crypto::ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256;
use tds_protocol::{CekTableEntry, CekValue, EncryptionType};

use crate::error::{Error, Result};
use crate::quoter::quote_identifier;

/// Procedure the server uses to describe parameter encryption.
pub const DESCRIBE_PARAMETER_ENCRYPTION: &str = "sp_describe_parameter_encryption";

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Caller-supplied name, with or without the leading `@`.
    pub name: Option<String>,
    /// 1-based position in the argument list.
    pub ordinal: usize,
    /// Bound value.
    pub value: SqlValue,
}

impl Parameter {
    /// A positional parameter, sent as `@p<ordinal>`.
    pub fn positional(ordinal: usize, value: impl Into<SqlValue>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    /// A named parameter.
    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<SqlValue>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
        }
    }

    /// Name as it appears in statement text, always `@`-prefixed.
    #[must_use]
    pub fn wire_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => normalize_param_name(name).into_owned(),
            _ => format!("@p{}", self.ordinal),
        }
    }

    fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Prefix `name` with `@` unless it is empty or already prefixed.
#[must_use]
pub fn normalize_param_name(name: &str) -> Cow<'_, str> {
    if name.is_empty() || name.starts_with('@') {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("@{name}"))
    }
}

/// Append `name` to `buf`, prefixed as by [`normalize_param_name`].
pub fn append_prefixed_param_name(buf: &mut String, name: &str) {
    if !name.is_empty() && !name.starts_with('@') {
        buf.push('@');
    }
    buf.push_str(name);
}

/// `EXEC` text for calling `proc_name` with `params`.
///
/// Positional parameters render as `@p<ordinal>`, named ones as
/// `@name=@name`, in argument order.
#[must_use]
pub fn build_exec_statement(proc_name: &str, params: &[Parameter]) -> String {
    let mut sql = String::from("EXEC ");
    sql.push_str(&quote_identifier(proc_name));

    for (i, param) in params.iter().enumerate() {
        sql.push_str(if i == 0 { " " } else { ", " });
        match param.name.as_deref() {
            Some(name) if param.is_named() => {
                append_prefixed_param_name(&mut sql, name);
                sql.push('=');
                append_prefixed_param_name(&mut sql, name);
            }
            _ => {
                let _ = write!(sql, "@p{}", param.ordinal);
            }
        }
    }
    sql
}

/// Parameter declaration list, e.g. `@p1 int, @name nvarchar(5)`.
#[must_use]
pub fn declare_params(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| format!("{} {}", p.wire_name(), declare_value(&p.value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A named RPC argument.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcArg {
    /// Argument name without the leading `@`.
    pub name: String,
    /// Argument value.
    pub value: SqlValue,
}

impl RpcArg {
    /// Create an argument.
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Name with the leading `@`.
    #[must_use]
    pub fn wire_name(&self) -> String {
        normalize_param_name(&self.name).into_owned()
    }
}

/// Arguments of `sp_describe_parameter_encryption`.
#[must_use]
pub fn describe_parameter_encryption_args(tsql: &str, params_decl: &str) -> Vec<RpcArg> {
    vec![
        RpcArg::new("tsql", SqlValue::String(tsql.to_string())),
        RpcArg::new("params", SqlValue::String(params_decl.to_string())),
    ]
}

/// Build the describe request for a statement.
///
/// For stored procedures `query` is the procedure name and the described
/// text is the synthesized `EXEC` statement.
pub fn prepare_encryption_query(is_proc: bool, query: &str, params: &[Parameter]) -> Result<Vec<RpcArg>> {
    let tsql = if is_proc {
        build_exec_statement(query, params)
    } else {
        query.to_string()
    };
    let mut seen = std::collections::HashSet::new();
    for param in params {
        if !seen.insert(param.wire_name()) {
            return Err(Error::Config(format!(
                "parameter {} is bound more than once",
                param.wire_name()
            )));
        }
    }
    Ok(describe_parameter_encryption_args(&tsql, &declare_params(params)))
}

/// One row of the first describe result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeCekRow {
    /// CEK ordinal referenced by parameter rows.
    pub ordinal: u16,
    /// Database id.
    pub database_id: u32,
    /// CEK id.
    pub cek_id: u32,
    /// CEK version.
    pub cek_version: u32,
    /// CEK metadata version.
    pub metadata_version: [u8; 8],
    /// Encrypted CEK.
    pub encrypted_value: Bytes,
    /// Provider name.
    pub key_store_provider_name: String,
    /// Master key path.
    pub cmk_path: String,
    /// Key encryption algorithm.
    pub encryption_algorithm: String,
}

/// One row of the second describe result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeParamRow {
    /// Parameter ordinal.
    pub ordinal: u16,
    /// Parameter name.
    pub name: String,
    /// Cell encryption algorithm id.
    pub algorithm_id: u8,
    /// Encryption type wire value.
    pub encryption_type: u8,
    /// CEK ordinal into the first result set.
    pub cek_ordinal: u16,
    /// Normalization rule version.
    pub rule_version: u8,
}

/// How to encrypt one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEncryptionDescriptor {
    /// Parameter ordinal.
    pub ordinal: u16,
    /// `@`-prefixed parameter name.
    pub name: String,
    /// Cell encryption algorithm id.
    pub algorithm_id: u8,
    /// Encryption type.
    pub encryption_type: EncryptionType,
    /// CEK ordinal.
    pub cek_ordinal: u16,
    /// Normalization rule version.
    pub rule_version: u8,
}

impl ParameterEncryptionDescriptor {
    /// Whether the parameter targets an encrypted column.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encryption_type != EncryptionType::Plaintext
    }
}

/// Server description of a statement's parameter encryption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterEncryptionInfo {
    /// Column encryption keys by ordinal.
    pub ceks: BTreeMap<u16, CekTableEntry>,
    /// Per-parameter descriptors.
    pub params: Vec<ParameterEncryptionDescriptor>,
}

impl ParameterEncryptionInfo {
    /// Correlate the two describe result sets.
    ///
    /// CEK rows sharing an ordinal are alternate encryptions of the same key
    /// under different master keys.
    pub fn from_describe_results(cek_rows: Vec<DescribeCekRow>, param_rows: Vec<DescribeParamRow>) -> Result<Self> {
        let mut ceks: BTreeMap<u16, CekTableEntry> = BTreeMap::new();
        for row in cek_rows {
            let value = CekValue {
                encrypted_value: row.encrypted_value,
                key_store_provider_name: row.key_store_provider_name,
                cmk_path: row.cmk_path,
                encryption_algorithm: row.encryption_algorithm,
            };
            ceks.entry(row.ordinal)
                .or_insert_with(|| CekTableEntry {
                    database_id: row.database_id,
                    cek_id: row.cek_id,
                    cek_version: row.cek_version,
                    cek_md_version: row.metadata_version,
                    values: Vec::new(),
                })
                .values
                .push(value);
        }

        let mut params = Vec::with_capacity(param_rows.len());
        for row in param_rows {
            let encryption_type = EncryptionType::from_u8(row.encryption_type)?;
            if encryption_type != EncryptionType::Plaintext {
                if row.algorithm_id != ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256 {
                    return Err(Error::UnsupportedAlgorithm(format!(
                        "algorithm id {} for parameter {}",
                        row.algorithm_id, row.name
                    )));
                }
                if !ceks.contains_key(&row.cek_ordinal) {
                    return Err(Error::UnknownCekOrdinal(row.cek_ordinal));
                }
            }
            params.push(ParameterEncryptionDescriptor {
                ordinal: row.ordinal,
                name: normalize_param_name(&row.name).into_owned(),
                algorithm_id: row.algorithm_id,
                encryption_type,
                cek_ordinal: row.cek_ordinal,
                rule_version: row.rule_version,
            });
        }

        tracing::debug!(
            ceks = ceks.len(),
            params = params.len(),
            "correlated parameter encryption metadata"
        );
        Ok(Self { ceks, params })
    }

    /// Descriptor for a parameter, by name with or without `@`.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&ParameterEncryptionDescriptor> {
        let name = normalize_param_name(name);
        self.params.iter().find(|d| d.name.eq_ignore_ascii_case(&name))
    }

    /// CEK entry for an ordinal.
    pub fn cek(&self, ordinal: u16) -> Result<&CekTableEntry> {
        self.ceks.get(&ordinal).ok_or(Error::UnknownCekOrdinal(ordinal))
    }

    /// Whether any parameter needs encryption.
    #[must_use]
    pub fn has_encrypted_params(&self) -> bool {
        self.params.iter().any(ParameterEncryptionDescriptor::is_encrypted)
    }
}
