//! Fixed-point values for `DECIMAL`, `NUMERIC`, `MONEY` and `SMALLMONEY`.
//!
//! SQL Server decimals carry up to 38 significant digits, more than
//! `rust_decimal` can hold, so values are kept as an `i128` mantissa plus a
//! scale and only converted to `rust_decimal::Decimal` on request.

use std::fmt;
use std::str::FromStr;

use tds_protocol::metadata::{MAX_DECIMAL_PRECISION, decimal_len};

use crate::error::TypeError;

/// Scale of `MONEY` and `SMALLMONEY` values.
pub const MONEY_SCALE: u8 = 4;

/// Divisor between the stored money integer and currency units.
pub const MONEY_DIVISOR: i64 = 10_000;

/// Sign byte marking a non-negative decimal on the wire.
const SIGN_POSITIVE: u8 = 1;

/// A fixed-point decimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Numeric {
    value: i128,
    scale: u8,
}

impl Numeric {
    /// Highest supported scale.
    pub const MAX_SCALE: u8 = MAX_DECIMAL_PRECISION;

    /// Create a value of `value * 10^-scale`.
    pub fn new(value: i128, scale: u8) -> Result<Self, TypeError> {
        if scale > Self::MAX_SCALE {
            return Err(TypeError::OutOfRange {
                target_type: "DECIMAL scale",
            });
        }
        Ok(Self { value, scale })
    }

    /// The unscaled integer.
    #[must_use]
    pub const fn value(&self) -> i128 {
        self.value
    }

    /// Digits after the decimal point.
    #[must_use]
    pub const fn scale(&self) -> u8 {
        self.scale
    }

    /// Whether the value is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Number of significant digits in the unscaled integer (at least 1).
    #[must_use]
    pub fn digits(&self) -> u8 {
        let mut magnitude = self.value.unsigned_abs();
        let mut digits = 1;
        while magnitude >= 10 {
            magnitude /= 10;
            digits += 1;
        }
        digits
    }

    /// Change the scale, rounding half away from zero when digits are dropped.
    pub fn rescale(&self, scale: u8) -> Result<Self, TypeError> {
        if scale > Self::MAX_SCALE {
            return Err(TypeError::OutOfRange {
                target_type: "DECIMAL scale",
            });
        }
        let value = if scale >= self.scale {
            let factor = pow10(scale - self.scale).ok_or(TypeError::OutOfRange {
                target_type: "DECIMAL",
            })?;
            self.value
                .checked_mul(factor)
                .ok_or(TypeError::OutOfRange {
                    target_type: "DECIMAL",
                })?
        } else {
            let factor = pow10(self.scale - scale).ok_or(TypeError::OutOfRange {
                target_type: "DECIMAL",
            })?;
            let quotient = self.value / factor;
            let remainder = (self.value % factor).unsigned_abs();
            if remainder * 2 >= factor.unsigned_abs() {
                quotient + self.value.signum()
            } else {
                quotient
            }
        };
        Ok(Self { value, scale })
    }

    /// Lossy conversion to `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.value as f64 / 10f64.powi(i32::from(self.scale))
    }
}

fn pow10(exp: u8) -> Option<i128> {
    10i128.checked_pow(u32::from(exp))
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.value.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if self.value < 0 {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        } else {
            write!(f, "0.{digits:0>scale$}")
        }
    }
}

impl FromStr for Numeric {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::UnsupportedConversion {
            from: format!("'{s}'"),
            to: "Numeric",
        };
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if (int.is_empty() && frac.is_empty())
            || !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let scale = u8::try_from(frac.len()).map_err(|_| invalid())?;
        let mut value: i128 = 0;
        for b in int.bytes().chain(frac.bytes()) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(b - b'0')))
                .ok_or(TypeError::OutOfRange {
                    target_type: "DECIMAL",
                })?;
        }
        Self::new(if negative { -value } else { value }, scale)
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Self {
            value: i128::from(value),
            scale: 0,
        }
    }
}

#[cfg(feature = "decimal")]
impl TryFrom<Numeric> for rust_decimal::Decimal {
    type Error = TypeError;

    fn try_from(n: Numeric) -> Result<Self, Self::Error> {
        rust_decimal::Decimal::try_from_i128_with_scale(n.value, u32::from(n.scale)).map_err(
            |_| TypeError::OutOfRange {
                target_type: "rust_decimal::Decimal",
            },
        )
    }
}

#[cfg(feature = "decimal")]
impl From<rust_decimal::Decimal> for Numeric {
    fn from(d: rust_decimal::Decimal) -> Self {
        // rust_decimal caps scale at 28, well inside MAX_SCALE.
        Self {
            value: d.mantissa(),
            scale: d.scale() as u8,
        }
    }
}

/// Decode a `DECIMAL`/`NUMERIC` value: sign byte then little-endian magnitude.
///
/// A zero magnitude is positive whatever the sign byte says.
pub fn decode_decimal(raw: &[u8], scale: u8) -> Result<Numeric, TypeError> {
    let Some((&sign, magnitude)) = raw.split_first() else {
        return Err(TypeError::short(1, 0));
    };
    if magnitude.len() > 16 {
        return Err(TypeError::InvalidLength {
            type_name: "DECIMAL",
            length: raw.len(),
        });
    }
    let mut bytes = [0u8; 16];
    bytes[..magnitude.len()].copy_from_slice(magnitude);
    let value = i128::try_from(u128::from_le_bytes(bytes)).map_err(|_| TypeError::OutOfRange {
        target_type: "DECIMAL",
    })?;
    let value = if sign == SIGN_POSITIVE { value } else { -value };
    Numeric::new(value, scale)
}

/// Encode a `DECIMAL`/`NUMERIC` value for the given precision and scale.
pub fn encode_decimal(n: &Numeric, precision: u8, scale: u8) -> Result<Vec<u8>, TypeError> {
    let n = n.rescale(scale)?;
    if precision == 0 || precision > MAX_DECIMAL_PRECISION || n.digits() > precision {
        return Err(TypeError::OutOfRange {
            target_type: "DECIMAL",
        });
    }
    let len = decimal_len(precision) as usize;
    let mut out = Vec::with_capacity(len);
    out.push(if n.value >= 0 { SIGN_POSITIVE } else { 0 });
    out.extend_from_slice(&n.value.unsigned_abs().to_le_bytes()[..len - 1]);
    Ok(out)
}

/// Decode an 8-byte `MONEY` value.
///
/// The wire stores the high 32 bits first, then the low 32 bits, each
/// little-endian.
pub fn decode_money(raw: &[u8]) -> Result<Numeric, TypeError> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| TypeError::short(8, raw.len()))?;
    let high = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let low = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let value = (i64::from(high) << 32) | i64::from(low);
    Numeric::new(i128::from(value), MONEY_SCALE)
}

/// Decode a 4-byte `SMALLMONEY` value.
pub fn decode_small_money(raw: &[u8]) -> Result<Numeric, TypeError> {
    let bytes: [u8; 4] = raw
        .try_into()
        .map_err(|_| TypeError::short(4, raw.len()))?;
    Numeric::new(i128::from(i32::from_le_bytes(bytes)), MONEY_SCALE)
}

/// Encode an 8-byte `MONEY` value.
pub fn encode_money(n: &Numeric) -> Result<[u8; 8], TypeError> {
    let value = i64::try_from(n.rescale(MONEY_SCALE)?.value).map_err(|_| TypeError::OutOfRange {
        target_type: "MONEY",
    })?;
    let high = ((value >> 32) as i32).to_le_bytes();
    let low = (value as u32).to_le_bytes();
    Ok([
        high[0], high[1], high[2], high[3], low[0], low[1], low[2], low[3],
    ])
}

/// Encode a 4-byte `SMALLMONEY` value.
pub fn encode_small_money(n: &Numeric) -> Result<[u8; 4], TypeError> {
    let value = i32::try_from(n.rescale(MONEY_SCALE)?.value).map_err(|_| TypeError::OutOfRange {
        target_type: "SMALLMONEY",
    })?;
    Ok(value.to_le_bytes())
}
