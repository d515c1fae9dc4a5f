//! Date and time wire formats.
//!
//! | Type | Layout |
//! |------|--------|
//! | `SMALLDATETIME` | u16 days since 1900-01-01, u16 minutes since midnight |
//! | `DATETIME` | i32 days since 1900-01-01, u32 1/300-second ticks |
//! | `DATE` | 3-byte unsigned days since 0001-01-01 |
//! | `TIME(n)` | 3 to 5 byte ticks at `10^-n` seconds |
//! | `DATETIME2(n)` | `TIME(n)` then `DATE` |
//! | `DATETIMEOFFSET(n)` | `DATETIME2(n)` in UTC then i16 offset minutes |
//!
//! Encoding clamps instants outside the representable range to the nearest
//! bound instead of failing.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use tds_protocol::metadata::{MAX_TIME_SCALE, time_len};

use crate::error::TypeError;

/// `num_days_from_ce` of 0001-01-01.
const CE_DAYS_0001: i32 = 1;

/// `num_days_from_ce` of 1900-01-01.
const CE_DAYS_1900: i32 = 693_596;

/// Day count of 9999-12-31 relative to 0001-01-01.
pub const MAX_DATE_DAYS: u32 = 3_652_058;

/// `DATETIME` ticks per second.
pub const THREE_HUNDREDTHS_PER_SECOND: u32 = 300;

const SECONDS_PER_DAY: u32 = 86_400;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const TICKS_PER_DAY: u32 = SECONDS_PER_DAY * THREE_HUNDREDTHS_PER_SECOND;

/// `DATETIME` day count of 1753-01-01.
const MIN_DATETIME_DAYS: i32 = -53_690;

/// `DATETIME` day count of 9999-12-31.
const MAX_DATETIME_DAYS: i32 = 2_958_463;

/// Largest nanosecond value DATETIME2 can carry at scale 7.
const MAX_SCALED_NANOS: u32 = 999_999_900;

/// Largest |offset| in minutes accepted for `DATETIMEOFFSET`.
const MAX_OFFSET_MINUTES: i16 = 14 * 60;

/// Round nanoseconds to the nearest 1/300 second.
#[must_use]
pub fn nanos_to_three_hundredths(nanos: u32) -> u32 {
    ((u64::from(nanos) * u64::from(THREE_HUNDREDTHS_PER_SECOND) + NANOS_PER_SECOND / 2)
        / NANOS_PER_SECOND) as u32
}

/// Convert 1/300-second ticks to nanoseconds, rounded to the nearest.
#[must_use]
pub fn three_hundredths_to_nanos(ticks: u32) -> u64 {
    let per = u64::from(THREE_HUNDREDTHS_PER_SECOND);
    (u64::from(ticks) * NANOS_PER_SECOND + per / 2) / per
}

fn date_from_ce(days: i64) -> Result<NaiveDate, TypeError> {
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("day number {days} out of range")))
}

fn time_from_nanos(nanos: u64) -> Result<NaiveTime, TypeError> {
    let secs = nanos / NANOS_PER_SECOND;
    let frac = (nanos % NANOS_PER_SECOND) as u32;
    u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, frac))
        .ok_or_else(|| TypeError::InvalidDateTime(format!("time of day {secs}s out of range")))
}

fn fixed<const N: usize>(raw: &[u8], type_name: &'static str) -> Result<[u8; N], TypeError> {
    raw.try_into().map_err(|_| {
        if raw.len() < N {
            TypeError::short(N, raw.len())
        } else {
            TypeError::InvalidLength {
                type_name,
                length: raw.len(),
            }
        }
    })
}

fn check_scale(scale: u8) -> Result<(), TypeError> {
    if scale > MAX_TIME_SCALE {
        return Err(TypeError::OutOfRange {
            target_type: "time scale",
        });
    }
    Ok(())
}

/// Decode `SMALLDATETIME`.
pub fn decode_small_datetime(raw: &[u8]) -> Result<NaiveDateTime, TypeError> {
    let b = fixed::<4>(raw, "SMALLDATETIME")?;
    let days = u16::from_le_bytes([b[0], b[1]]);
    let minutes = u16::from_le_bytes([b[2], b[3]]);
    let date = date_from_ce(i64::from(CE_DAYS_1900) + i64::from(days))?;
    let time = time_from_nanos(u64::from(minutes) * 60 * NANOS_PER_SECOND)?;
    Ok(date.and_time(time))
}

/// Encode `SMALLDATETIME`, truncating to the minute.
///
/// Instants before 1900-01-01 clamp to the epoch and instants past the last
/// representable day clamp to its final minute.
#[must_use]
pub fn encode_small_datetime(dt: NaiveDateTime) -> [u8; 4] {
    let days = dt.date().num_days_from_ce() - CE_DAYS_1900;
    let (days, minutes) = if days < 0 {
        (0, 0)
    } else if days > i32::from(u16::MAX) {
        (u16::MAX, 24 * 60 - 1)
    } else {
        (days as u16, (dt.hour() * 60 + dt.minute()) as u16)
    };
    let d = days.to_le_bytes();
    let m = minutes.to_le_bytes();
    [d[0], d[1], m[0], m[1]]
}

/// Decode `DATETIME`.
pub fn decode_datetime(raw: &[u8]) -> Result<NaiveDateTime, TypeError> {
    let b = fixed::<8>(raw, "DATETIME")?;
    let days = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    let ticks = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
    if ticks >= TICKS_PER_DAY {
        return Err(TypeError::InvalidDateTime(format!(
            "DATETIME tick count {ticks} exceeds one day"
        )));
    }
    let date = date_from_ce(i64::from(CE_DAYS_1900) + i64::from(days))?;
    let time = time_from_nanos(three_hundredths_to_nanos(ticks))?;
    Ok(date.and_time(time))
}

/// Encode `DATETIME`, rounding to the nearest 1/300 second and clamping to
/// 1753-01-01 ..= 9999-12-31 23:59:59.997.
#[must_use]
pub fn encode_datetime(dt: NaiveDateTime) -> [u8; 8] {
    let mut days = dt.date().num_days_from_ce() - CE_DAYS_1900;
    let nanos = dt.nanosecond().min(NANOS_PER_SECOND as u32 - 1);
    let mut ticks = dt.num_seconds_from_midnight() * THREE_HUNDREDTHS_PER_SECOND
        + nanos_to_three_hundredths(nanos);
    if ticks >= TICKS_PER_DAY {
        days += 1;
        ticks -= TICKS_PER_DAY;
    }
    if days < MIN_DATETIME_DAYS {
        days = MIN_DATETIME_DAYS;
        ticks = 0;
    } else if days > MAX_DATETIME_DAYS {
        days = MAX_DATETIME_DAYS;
        ticks = TICKS_PER_DAY - 1;
    }
    let d = days.to_le_bytes();
    let t = ticks.to_le_bytes();
    [d[0], d[1], d[2], d[3], t[0], t[1], t[2], t[3]]
}

/// Read the 3-byte day count of a `DATE`.
pub fn decode_date_days(raw: &[u8]) -> Result<u32, TypeError> {
    let b = fixed::<3>(raw, "DATE")?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

/// Decode `DATE`.
pub fn decode_date(raw: &[u8]) -> Result<NaiveDate, TypeError> {
    let days = decode_date_days(raw)?;
    date_from_ce(i64::from(CE_DAYS_0001) + i64::from(days))
}

/// Encode `DATE`, clamping to 0001-01-01 ..= 9999-12-31.
#[must_use]
pub fn encode_date(date: NaiveDate) -> [u8; 3] {
    let days = (date.num_days_from_ce() - CE_DAYS_0001).clamp(0, MAX_DATE_DAYS as i32) as u32;
    let b = days.to_le_bytes();
    [b[0], b[1], b[2]]
}

/// Split an instant into (days since 0001-01-01, seconds since midnight,
/// nanoseconds), clamped to the `DATETIME2` range.
#[must_use]
pub fn datetime2_parts(dt: NaiveDateTime) -> (u32, u32, u32) {
    let days = dt.date().num_days_from_ce() - CE_DAYS_0001;
    if days < 0 {
        return (0, 0, 0);
    }
    if days > MAX_DATE_DAYS as i32 {
        return (MAX_DATE_DAYS, SECONDS_PER_DAY - 1, MAX_SCALED_NANOS);
    }
    let nanos = dt.nanosecond().min(NANOS_PER_SECOND as u32 - 1);
    (days as u32, dt.num_seconds_from_midnight(), nanos)
}

/// Ticks at `10^-scale` seconds for a time of day, truncating extra digits.
#[must_use]
pub fn time_ticks(seconds: u32, nanos: u32, scale: u8) -> u64 {
    let scale = scale.min(MAX_TIME_SCALE);
    u64::from(seconds) * 10u64.pow(u32::from(scale))
        + u64::from(nanos) / 10u64.pow(9 - u32::from(scale))
}

/// Split a `TIME` field into (seconds since midnight, nanoseconds).
pub fn decode_time_ticks(scale: u8, raw: &[u8]) -> Result<(u32, u32), TypeError> {
    check_scale(scale)?;
    let width = time_len(scale);
    if raw.len() != width {
        return Err(if raw.len() < width {
            TypeError::short(width, raw.len())
        } else {
            TypeError::InvalidLength {
                type_name: "TIME",
                length: raw.len(),
            }
        });
    }
    let mut bytes = [0u8; 8];
    bytes[..width].copy_from_slice(raw);
    let ticks = u64::from_le_bytes(bytes);
    let unit = 10u64.pow(u32::from(scale));
    let seconds = ticks / unit;
    if seconds >= u64::from(SECONDS_PER_DAY) {
        return Err(TypeError::InvalidDateTime(format!(
            "TIME tick count {ticks} exceeds one day"
        )));
    }
    let nanos = (ticks % unit) * 10u64.pow(9 - u32::from(scale));
    Ok((seconds as u32, nanos as u32))
}

fn encode_time_field(seconds: u32, nanos: u32, scale: u8, out: &mut Vec<u8>) {
    let ticks = time_ticks(seconds, nanos, scale).to_le_bytes();
    out.extend_from_slice(&ticks[..time_len(scale)]);
}

/// Decode `TIME(scale)`.
pub fn decode_time(scale: u8, raw: &[u8]) -> Result<NaiveTime, TypeError> {
    let (seconds, nanos) = decode_time_ticks(scale, raw)?;
    time_from_nanos(u64::from(seconds) * NANOS_PER_SECOND + u64::from(nanos))
}

/// Encode `TIME(scale)`.
pub fn encode_time(time: NaiveTime, scale: u8) -> Result<Vec<u8>, TypeError> {
    check_scale(scale)?;
    let mut out = Vec::with_capacity(time_len(scale));
    let nanos = time.nanosecond().min(NANOS_PER_SECOND as u32 - 1);
    encode_time_field(time.num_seconds_from_midnight(), nanos, scale, &mut out);
    Ok(out)
}

fn split_datetime2(scale: u8, raw: &[u8], trailer: usize) -> Result<NaiveDateTime, TypeError> {
    check_scale(scale)?;
    let width = time_len(scale);
    let expected = width + 3 + trailer;
    if raw.len() < expected {
        return Err(TypeError::short(expected, raw.len()));
    }
    let time = decode_time(scale, &raw[..width])?;
    let date = decode_date(&raw[width..width + 3])?;
    Ok(date.and_time(time))
}

/// Decode `DATETIME2(scale)`.
pub fn decode_datetime2(scale: u8, raw: &[u8]) -> Result<NaiveDateTime, TypeError> {
    let expected = time_len(scale) + 3;
    if raw.len() > expected {
        return Err(TypeError::InvalidLength {
            type_name: "DATETIME2",
            length: raw.len(),
        });
    }
    split_datetime2(scale, raw, 0)
}

fn encode_datetime2_into(dt: NaiveDateTime, scale: u8, out: &mut Vec<u8>) {
    let (days, seconds, nanos) = datetime2_parts(dt);
    encode_time_field(seconds, nanos, scale, out);
    let d = days.to_le_bytes();
    out.extend_from_slice(&d[..3]);
}

/// Encode `DATETIME2(scale)`.
pub fn encode_datetime2(dt: NaiveDateTime, scale: u8) -> Result<Vec<u8>, TypeError> {
    check_scale(scale)?;
    let mut out = Vec::with_capacity(time_len(scale) + 3);
    encode_datetime2_into(dt, scale, &mut out);
    Ok(out)
}

/// Decode `DATETIMEOFFSET(scale)`, preserving the offset.
pub fn decode_datetimeoffset(scale: u8, raw: &[u8]) -> Result<DateTime<FixedOffset>, TypeError> {
    let width = time_len(scale) + 3;
    if raw.len() > width + 2 {
        return Err(TypeError::InvalidLength {
            type_name: "DATETIMEOFFSET",
            length: raw.len(),
        });
    }
    let utc = split_datetime2(scale, raw, 2)?;
    let minutes = i16::from_le_bytes([raw[width], raw[width + 1]]);
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(TypeError::InvalidDateTime(format!(
            "offset of {minutes} minutes out of range"
        )));
    }
    let offset = FixedOffset::east_opt(i32::from(minutes) * 60)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("invalid offset: {minutes}")))?;
    Ok(offset.from_utc_datetime(&utc))
}

/// Encode `DATETIMEOFFSET(scale)`: the instant in UTC plus the offset.
pub fn encode_datetimeoffset(dt: DateTime<FixedOffset>, scale: u8) -> Result<Vec<u8>, TypeError> {
    check_scale(scale)?;
    let mut out = Vec::with_capacity(time_len(scale) + 5);
    encode_datetime2_into(dt.naive_utc(), scale, &mut out);
    let minutes = (dt.offset().local_minus_utc() / 60) as i16;
    out.extend_from_slice(&minutes.to_le_bytes());
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_decode_small_datetime() {
        let cases = [
            (0u16, 0u16, ymd_hms(1900, 1, 1, 0, 0, 0)),
            (1, 0, ymd_hms(1900, 1, 2, 0, 0, 0)),
            (0, 720, ymd_hms(1900, 1, 1, 12, 0, 0)),
            (36524, 0, ymd_hms(2000, 1, 1, 0, 0, 0)),
            (0, 1439, ymd_hms(1900, 1, 1, 23, 59, 0)),
        ];
        for (days, mins, want) in cases {
            let mut raw = days.to_le_bytes().to_vec();
            raw.extend_from_slice(&mins.to_le_bytes());
            assert_eq!(decode_small_datetime(&raw).unwrap(), want);
        }
        assert!(decode_small_datetime(&[0, 0, 0xA0, 0x05]).is_err());
    }

    #[test]
    fn test_encode_small_datetime() {
        let split = |b: [u8; 4]| {
            (
                u16::from_le_bytes([b[0], b[1]]),
                u16::from_le_bytes([b[2], b[3]]),
            )
        };
        assert_eq!(split(encode_small_datetime(ymd_hms(1900, 1, 1, 14, 3, 0))), (0, 843));
        assert_eq!(split(encode_small_datetime(ymd_hms(1899, 12, 1, 12, 30, 0))), (0, 0));
        assert_eq!(
            split(encode_small_datetime(ymd_hms(2000, 1, 1, 6, 30, 0))),
            (36524, 390)
        );
    }

    #[test]
    fn test_small_datetime_roundtrip_to_minute() {
        let dt = ymd_hms(2025, 7, 4, 14, 30, 59);
        let decoded = decode_small_datetime(&encode_small_datetime(dt)).unwrap();
        assert_eq!(decoded, ymd_hms(2025, 7, 4, 14, 30, 0));
    }

    #[test]
    fn test_nanos_to_three_hundredths() {
        assert_eq!(nanos_to_three_hundredths(0), 0);
        assert_eq!(nanos_to_three_hundredths(1_000_000), 0);
        assert_eq!(nanos_to_three_hundredths(10_000_000), 3);
        assert_eq!(nanos_to_three_hundredths(100_000_000), 30);
        assert_eq!(nanos_to_three_hundredths(500_000_000), 150);
        assert_eq!(nanos_to_three_hundredths(999_999_999), 300);
    }

    #[test]
    fn test_three_hundredths_to_nanos() {
        assert_eq!(three_hundredths_to_nanos(0), 0);
        assert_eq!(three_hundredths_to_nanos(1), 3_333_333);
        assert_eq!(three_hundredths_to_nanos(3), 10_000_000);
        assert_eq!(three_hundredths_to_nanos(150), 500_000_000);
        assert_eq!(three_hundredths_to_nanos(300), 1_000_000_000);
        for ticks in [0, 1, 10, 100, 299] {
            let back = nanos_to_three_hundredths(three_hundredths_to_nanos(ticks) as u32);
            assert_eq!(back, ticks);
        }
    }

    #[test]
    fn test_decode_datetime() {
        let raw = |days: i32, ticks: u32| {
            let mut v = days.to_le_bytes().to_vec();
            v.extend_from_slice(&ticks.to_le_bytes());
            v
        };
        assert_eq!(decode_datetime(&raw(0, 0)).unwrap(), ymd_hms(1900, 1, 1, 0, 0, 0));
        assert_eq!(decode_datetime(&raw(1, 0)).unwrap(), ymd_hms(1900, 1, 2, 0, 0, 0));
        assert_eq!(decode_datetime(&raw(0, 300)).unwrap(), ymd_hms(1900, 1, 1, 0, 0, 1));
        assert_eq!(decode_datetime(&raw(0, 18_000)).unwrap(), ymd_hms(1900, 1, 1, 0, 1, 0));
        assert_eq!(
            decode_datetime(&raw(0, 1_080_000)).unwrap(),
            ymd_hms(1900, 1, 1, 1, 0, 0)
        );
        assert_eq!(decode_datetime(&raw(-1, 0)).unwrap(), ymd_hms(1899, 12, 31, 0, 0, 0));
        assert!(decode_datetime(&raw(0, TICKS_PER_DAY)).is_err());
        assert!(decode_datetime(&[0; 7]).is_err());
    }

    #[test]
    fn test_encode_datetime_roundtrip_within_tick() {
        for dt in [
            ymd_hms(1900, 1, 1, 0, 0, 0),
            ymd_hms(2000, 1, 1, 12, 0, 0),
            ymd_hms(2020, 6, 15, 14, 30, 45),
            NaiveDate::from_ymd_opt(2020, 6, 15)
                .unwrap()
                .and_hms_milli_opt(14, 30, 45, 123)
                .unwrap(),
        ] {
            let decoded = decode_datetime(&encode_datetime(dt)).unwrap();
            let diff = (decoded - dt).num_milliseconds().abs();
            assert!(diff <= 4, "{dt} -> {decoded}");
        }
    }

    #[test]
    fn test_encode_datetime_rounds_into_next_day() {
        let dt = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap();
        assert_eq!(
            decode_datetime(&encode_datetime(dt)).unwrap(),
            ymd_hms(2020, 1, 2, 0, 0, 0)
        );
    }

    #[test]
    fn test_encode_datetime_clamps_to_range() {
        let min = ymd_hms(1753, 1, 1, 0, 0, 0);
        assert_eq!(decode_datetime(&encode_datetime(min)).unwrap(), min);
        assert_eq!(decode_datetime(&encode_datetime(ymd_hms(1, 1, 1, 0, 0, 0))).unwrap(), min);
        assert_eq!(
            decode_datetime(&encode_datetime(ymd_hms(1752, 12, 31, 23, 59, 59))).unwrap(),
            min
        );

        let raw = encode_datetime(ymd_hms(1, 6, 1, 13, 0, 0));
        assert_eq!(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]), MIN_DATETIME_DAYS);
        assert_eq!(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]), 0);

        let max = NaiveDate::from_ymd_opt(9999, 12, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 997)
            .unwrap();
        let raw = encode_datetime(
            NaiveDate::from_ymd_opt(9999, 12, 31)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap(),
        );
        assert_eq!(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]), MAX_DATETIME_DAYS);
        assert_eq!(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]), TICKS_PER_DAY - 1);
        let decoded = decode_datetime(&raw).unwrap();
        assert_eq!(decoded.date().year(), 9999);
        assert!((decoded - max).num_milliseconds().abs() <= 1, "{decoded}");
    }

    #[test]
    fn test_encode_datetime_clamps_after_year_9999() {
        let raw = encode_datetime(ymd_hms(10_500, 3, 1, 8, 0, 0));
        assert_eq!(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]), MAX_DATETIME_DAYS);
        assert_eq!(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]), TICKS_PER_DAY - 1);
        assert_eq!(
            decode_datetime(&raw).unwrap().date(),
            NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_date() {
        let d2000 = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(encode_date(d2000), [0x07, 0x24, 0x0B]);
        assert_eq!(decode_date_days(&[0x07, 0x24, 0x0B]).unwrap(), 730_119);
        assert_eq!(decode_date_days(&[0xFF, 0xFF, 0xFF]).unwrap(), 16_777_215);
        assert_eq!(decode_date(&[0x07, 0x24, 0x0B]).unwrap(), d2000);
        assert_eq!(
            decode_date(&365u32.to_le_bytes()[..3]).unwrap(),
            NaiveDate::from_ymd_opt(2, 1, 1).unwrap()
        );
        assert_eq!(
            decode_date(&[0, 0, 0]).unwrap(),
            NaiveDate::from_ymd_opt(1, 1, 1).unwrap()
        );
        assert!(decode_date(&[0, 0]).is_err());
    }

    #[test]
    fn test_datetime2_parts_clamp() {
        assert_eq!(datetime2_parts(ymd_hms(1, 1, 1, 0, 0, 0)), (0, 0, 0));
        assert_eq!(datetime2_parts(ymd_hms(2000, 1, 1, 12, 0, 0)), (730_119, 43_200, 0));
        let before = NaiveDate::from_ymd_opt(0, 1, 1)
            .unwrap()
            .and_hms_nano_opt(12, 30, 45, 123)
            .unwrap();
        assert_eq!(datetime2_parts(before), (0, 0, 0));
        assert_eq!(
            datetime2_parts(ymd_hms(10000, 1, 1, 0, 0, 0)),
            (3_652_058, 86_399, 999_999_900)
        );
    }

    #[test]
    fn test_time_widths() {
        let t = NaiveTime::from_hms_opt(10, 15, 30).unwrap();
        for (scale, width) in [(0, 3), (1, 3), (2, 3), (3, 4), (4, 4), (5, 5), (6, 5), (7, 5)] {
            let encoded = encode_time(t, scale).unwrap();
            assert_eq!(encoded.len(), width, "scale {scale}");
            assert_eq!(decode_time(scale, &encoded).unwrap(), t);
        }
        assert!(encode_time(t, 8).is_err());
    }

    #[test]
    fn test_decode_time_ticks() {
        assert_eq!(decode_time_ticks(0, &[0, 0, 0]).unwrap(), (0, 0));
        assert_eq!(decode_time_ticks(0, &[1, 0, 0]).unwrap(), (1, 0));
        assert_eq!(decode_time_ticks(0, &[10, 0, 0]).unwrap(), (10, 0));
        assert_eq!(decode_time_ticks(3, &[0xE8, 0x03, 0, 0]).unwrap(), (1, 0));
        assert!(decode_time_ticks(0, &[0x80, 0x51, 0x01]).is_err());
        assert!(decode_time_ticks(7, &[0, 0, 0]).is_err());
    }

    #[test]
    fn test_datetime2_roundtrip_truncates_to_scale() {
        let dt = NaiveDate::from_ymd_opt(2020, 6, 15)
            .unwrap()
            .and_hms_nano_opt(14, 30, 45, 123_456_700)
            .unwrap();
        let decoded = decode_datetime2(7, &encode_datetime2(dt, 7).unwrap()).unwrap();
        assert_eq!(decoded, dt);

        let decoded = decode_datetime2(3, &encode_datetime2(dt, 3).unwrap()).unwrap();
        assert_eq!(
            decoded,
            NaiveDate::from_ymd_opt(2020, 6, 15)
                .unwrap()
                .and_hms_nano_opt(14, 30, 45, 123_000_000)
                .unwrap()
        );

        let encoded = encode_datetime2(ymd_hms(2020, 6, 15, 14, 30, 0), 0).unwrap();
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode_datetime2(0, &encoded).unwrap(), ymd_hms(2020, 6, 15, 14, 30, 0));
        assert_eq!(decode_datetime2(0, &[0; 6]).unwrap(), ymd_hms(1, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_datetime2_clamps_out_of_range() {
        let far = ymd_hms(10000, 6, 1, 0, 0, 0);
        let decoded = decode_datetime2(7, &encode_datetime2(far, 7).unwrap()).unwrap();
        assert_eq!(
            decoded,
            NaiveDate::from_ymd_opt(9999, 12, 31)
                .unwrap()
                .and_hms_nano_opt(23, 59, 59, 999_999_900)
                .unwrap()
        );
    }

    #[test]
    fn test_datetimeoffset_roundtrip_preserves_offset() {
        let cases = [
            (5 * 3600 + 30 * 60, 7u8, 123_456_700u32),
            (-8 * 3600, 3, 0),
            (0, 0, 0),
        ];
        for (offset_secs, scale, nanos) in cases {
            let offset = FixedOffset::east_opt(offset_secs).unwrap();
            let local = NaiveDate::from_ymd_opt(2020, 6, 15)
                .unwrap()
                .and_hms_nano_opt(14, 30, 45, nanos)
                .unwrap();
            let dt = offset.from_local_datetime(&local).unwrap();

            let encoded = encode_datetimeoffset(dt, scale).unwrap();
            assert_eq!(encoded.len(), time_len(scale) + 5);
            let decoded = decode_datetimeoffset(scale, &encoded).unwrap();
            assert_eq!(decoded, dt);
            assert_eq!(decoded.offset().local_minus_utc(), offset_secs);
        }
    }

    #[test]
    fn test_datetimeoffset_stores_utc() {
        let offset = FixedOffset::east_opt(-8 * 3600).unwrap();
        let dt = offset
            .from_local_datetime(&ymd_hms(2020, 6, 15, 20, 0, 0))
            .unwrap();
        let encoded = encode_datetimeoffset(dt, 0).unwrap();
        assert_eq!(
            decode_datetime2(0, &encoded[..6]).unwrap(),
            ymd_hms(2020, 6, 16, 4, 0, 0)
        );
        assert_eq!(i16::from_le_bytes([encoded[6], encoded[7]]), -480);
    }
}
