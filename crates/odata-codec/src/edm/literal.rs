//! Primitive literal checks.
//!
//! Values travel as string-encoded scalars. Before a literal is written
//! under a declared primitive kind (or accepted from a typed payload) it is
//! checked for coercibility: integer ranges, decimal grammar, Guid layout,
//! RFC 3339 dates/times, ISO 8601 durations and base64 binaries.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};

use crate::edm::kind::EdmPrimitiveKind;

/// Error type for literal coercion failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub message: String,
}

impl LiteralError {
    fn new(kind: EdmPrimitiveKind, literal: &str) -> Self {
        Self {
            message: format!("{literal:?} is not a valid Edm.{} literal", kind.name()),
        }
    }
}

impl std::fmt::Display for LiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LiteralError {}

/// Checks that `literal` can be coerced to `kind`.
pub fn check_literal(kind: EdmPrimitiveKind, literal: &str) -> Result<(), LiteralError> {
    use EdmPrimitiveKind::*;

    let ok = match kind {
        Boolean => literal == "true" || literal == "false",
        Byte => literal.parse::<u8>().is_ok(),
        SByte => literal.parse::<i8>().is_ok(),
        Int16 => literal.parse::<i16>().is_ok(),
        Int32 => literal.parse::<i32>().is_ok(),
        Int64 => literal.parse::<i64>().is_ok(),
        Single => is_float_literal(literal, f32::MAX as f64),
        Double => is_float_literal(literal, f64::MAX),
        Decimal => is_decimal_literal(literal),
        Guid => is_guid(literal),
        Date => parse_date(literal).is_some(),
        DateTimeOffset => is_date_time_offset(literal),
        DateTime => is_date_time(literal),
        TimeOfDay => parse_time_of_day(literal).is_some(),
        Duration | Time => is_duration(literal),
        Binary => is_base64(literal),
        String | Stream => true,
        // Geospatial values never travel as string literals.
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(LiteralError::new(kind, literal))
    }
}

/// Returns the number of digits before and after the decimal point.
pub fn decimal_digits(literal: &str) -> Option<(usize, usize)> {
    if !is_decimal_literal(literal) {
        return None;
    }
    let unsigned = literal.trim_start_matches(['-', '+']);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    let significant_int = int_part.trim_start_matches('0').len();
    Some((significant_int, frac_part.len()))
}

fn is_float_literal(literal: &str, max: f64) -> bool {
    if matches!(literal, "NaN" | "INF" | "-INF") {
        return true;
    }
    if literal.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return false;
    }
    match literal.parse::<f64>() {
        Ok(v) => v.is_finite() && v.abs() <= max,
        Err(_) => false,
    }
}

fn is_decimal_literal(literal: &str) -> bool {
    let unsigned = literal.strip_prefix(['-', '+']).unwrap_or(literal);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

fn is_guid(literal: &str) -> bool {
    let bytes = literal.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

fn is_base64(literal: &str) -> bool {
    STANDARD.decode(literal).is_ok()
        || URL_SAFE.decode(literal).is_ok()
        || STANDARD_NO_PAD.decode(literal).is_ok()
        || URL_SAFE_NO_PAD.decode(literal).is_ok()
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `YYYY-MM-DD` (negative years allowed) into (year, month, day).
fn parse_date(s: &str) -> Option<(i32, u32, u32)> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut parts = body.splitn(3, '-');
    let year_str = parts.next()?;
    if year_str.len() < 4 {
        return None;
    }
    let year: i32 = digits(year_str)?;
    let month: u32 = digits(parts.next().filter(|p| p.len() == 2)?)?;
    let day: u32 = digits(parts.next().filter(|p| p.len() == 2)?)?;
    let year = if negative { -year } else { year };

    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
        return None;
    }
    Some((year, month, day))
}

/// `HH:MM[:SS[.fffffffffffff]]` into microseconds since midnight.
fn parse_time_of_day(s: &str) -> Option<i64> {
    let (hms, frac) = match s.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (s, None),
    };
    let mut parts = hms.split(':');
    let hours: i64 = digits(parts.next().filter(|p| p.len() == 2)?)?;
    let minutes: i64 = digits(parts.next().filter(|p| p.len() == 2)?)?;
    let seconds: i64 = match parts.next() {
        Some(p) if p.len() == 2 => digits(p)?,
        Some(_) => return None,
        None if frac.is_some() => return None,
        None => 0,
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    let micros = match frac {
        Some(f) if f.is_empty() || f.len() > 12 || !f.bytes().all(|b| b.is_ascii_digit()) => {
            return None;
        }
        Some(f) => {
            let padded = format!("{f:0<6}");
            padded[..6].parse::<i64>().ok()?
        }
        None => 0,
    };
    Some(((hours * 60 + minutes) * 60 + seconds) * 1_000_000 + micros)
}

/// `Z`, `+HH:MM` or `-HH:MM` into an offset in minutes.
fn parse_timezone_offset(offset: &str) -> Option<i16> {
    if offset == "Z" || offset == "z" {
        return Some(0);
    }
    if offset.len() != 6 || offset.as_bytes()[3] != b':' {
        return None;
    }
    let sign = match offset.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i16 = digits(&offset[1..3])?;
    let minutes: i16 = digits(&offset[4..6])?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

fn split_date_time(s: &str) -> Option<(&str, &str)> {
    let sep = s.find(['T', 't'])?;
    Some((&s[..sep], &s[sep + 1..]))
}

fn is_date_time_offset(s: &str) -> bool {
    let Some((date, rest)) = split_date_time(s) else {
        return false;
    };
    let tz_start = rest
        .rfind(['Z', 'z', '+', '-'])
        .filter(|i| *i >= 5);
    let Some(tz_start) = tz_start else {
        return false;
    };
    parse_date(date).is_some()
        && parse_time_of_day(&rest[..tz_start]).is_some()
        && parse_timezone_offset(&rest[tz_start..]).is_some()
}

/// Pre-v4 `Edm.DateTime`: no offset, optional trailing `Z`.
fn is_date_time(s: &str) -> bool {
    let Some((date, time)) = split_date_time(s) else {
        return false;
    };
    let time = time.strip_suffix(['Z', 'z']).unwrap_or(time);
    parse_date(date).is_some() && parse_time_of_day(time).is_some()
}

/// ISO 8601 day-time duration: `[-]P[nD][T[nH][nM][n[.n]S]]`.
fn is_duration(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let Some(body) = body.strip_prefix('P') else {
        return false;
    };
    if body.is_empty() {
        return false;
    }
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };
    if !date_part.is_empty() {
        match date_part.strip_suffix('D') {
            Some(days) if digits::<u64>(days).is_some() => {}
            _ => return false,
        }
    }
    let Some(mut rest) = time_part else {
        return true;
    };
    if rest.is_empty() {
        return false;
    }
    for (unit, fractional) in [('H', false), ('M', false), ('S', true)] {
        if let Some(idx) = rest.find(unit) {
            let number = &rest[..idx];
            let valid = if fractional {
                is_decimal_literal(number) && !number.starts_with(['-', '+'])
            } else {
                digits::<u64>(number).is_some()
            };
            if !valid {
                return false;
            }
            rest = &rest[idx + 1..];
        }
    }
    rest.is_empty()
}
