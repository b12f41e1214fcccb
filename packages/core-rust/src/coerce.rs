//! String-to-value coercion for a single resolved primitive kind.
//!
//! Unparseable numbers and dates are not errors: they become the NaN and
//! invalid-date sentinels so the downstream validator can report them as
//! field errors. Only structural kinds and malformed big integers fail.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use num_bigint::BigInt;

use crate::error::FormError;
use crate::schema::PrimitiveKind;
use crate::value::{FormValue, Symbol};

/// Coerces one raw text value (or its absence) into `kind`.
///
/// Returns `Ok(None)` when the result is "no value".
///
/// Empty or absent input yields `false` for booleans, and otherwise `null`
/// when `is_nullable`, else the raw value unchanged (absent stays absent,
/// empty text stays empty text).
///
/// # Errors
///
/// Returns a schema error for `array`, `set`, and `object`, which no single
/// string can represent, and [`FormError::BigIntSyntax`] for malformed
/// big-integer text.
pub fn coerce_scalar(
    field: &str,
    raw: Option<&str>,
    kind: PrimitiveKind,
    is_nullable: bool,
) -> Result<Option<FormValue>, FormError> {
    if kind.is_structural() {
        return Err(structural_error(field, kind));
    }

    if kind == PrimitiveKind::Boolean {
        return Ok(Some(FormValue::Bool(parse_bool(raw))));
    }

    let text = match raw {
        Some(text) if !text.is_empty() => text,
        _ if is_nullable => return Ok(Some(FormValue::Null)),
        _ => return Ok(raw.map(FormValue::from)),
    };

    let value = match kind {
        PrimitiveKind::String | PrimitiveKind::Any => FormValue::from(text),
        PrimitiveKind::Integer => parse_int(text),
        PrimitiveKind::Number => parse_float(text),
        PrimitiveKind::UnixTime => parse_date(text).map_or(FormValue::InvalidDate, FormValue::Date),
        PrimitiveKind::BigInt => FormValue::BigInt(parse_bigint(text).ok_or_else(|| {
            FormError::BigIntSyntax {
                field: field.to_string(),
                value: text.to_string(),
            }
        })?),
        PrimitiveKind::Symbol => FormValue::Symbol(Symbol::new(text)),
        PrimitiveKind::Null => FormValue::Null,
        PrimitiveKind::Undefined => return Ok(None),
        PrimitiveKind::Boolean => FormValue::Bool(parse_bool(Some(text))),
        PrimitiveKind::Array | PrimitiveKind::Set | PrimitiveKind::Object => {
            return Err(structural_error(field, kind));
        }
    };
    Ok(Some(value))
}

fn structural_error(field: &str, kind: PrimitiveKind) -> FormError {
    let name = kind.as_str();
    let mut capitalised = name[..1].to_ascii_uppercase();
    capitalised.push_str(&name[1..]);
    FormError::schema(
        field,
        format!(
            "{capitalised} type found. Submit the form as an escaped payload to use nested data structures."
        ),
    )
}

/// Absent, empty, and the literal `"false"` are false; everything else is true.
#[must_use]
pub fn parse_bool(raw: Option<&str>) -> bool {
    !matches!(raw, None | Some("" | "false"))
}

/// Base-10 integer from the longest leading run of digits, after optional
/// whitespace and sign. No digits yields NaN; values beyond `i64` become
/// floating point.
#[must_use]
pub fn parse_int(text: &str) -> FormValue {
    let trimmed = text.trim_start();
    let (negative, rest) = split_sign(trimmed);
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return FormValue::nan();
    }

    let digits = &rest[..digits_len];
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    match signed.parse::<i64>() {
        Ok(n) => FormValue::Integer(n),
        Err(_) => FormValue::Number(signed.parse::<f64>().unwrap_or(f64::NAN)),
    }
}

/// Floating-point number from the longest leading decimal literal
/// (`Infinity` included). No literal yields NaN.
#[must_use]
pub fn parse_float(text: &str) -> FormValue {
    let trimmed = text.trim_start();
    let (negative, rest) = split_sign(trimmed);
    let sign = if negative { -1.0 } else { 1.0 };

    if rest.starts_with("Infinity") {
        return FormValue::Number(sign * f64::INFINITY);
    }

    let bytes = rest.as_bytes();
    let mut end = 0;
    let int_digits = count_digits(bytes, end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(bytes, end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return FormValue::nan();
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(bytes, exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    rest[..end]
        .parse::<f64>()
        .map_or_else(|_| FormValue::nan(), |n| FormValue::Number(sign * n))
}

/// Reads a date from text.
///
/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DDTHH:MM[:SS[.fff]]` (UTC),
/// `YYYY-MM-DD`, `YYYY-MM`, and `YYYY` (UTC midnight).
#[must_use]
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    let parts: Vec<&str> = text.split('-').collect();
    let date = match parts.as_slice() {
        [y] if y.len() == 4 && all_digits(y) => NaiveDate::from_ymd_opt(y.parse().ok()?, 1, 1),
        [y, m] if y.len() == 4 && m.len() == 2 && all_digits(y) && all_digits(m) => {
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1)
        }
        [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
        }
        _ => None,
    }?;
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Arbitrary-precision integer from decimal (optionally signed) or
/// `0x`/`0o`/`0b` prefixed text, surrounding whitespace ignored.
#[must_use]
pub fn parse_bigint(text: &str) -> Option<BigInt> {
    let text = text.trim();
    let radix_prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    for (prefix, radix) in radix_prefixed {
        if let Some(digits) = text.strip_prefix(prefix) {
            if digits.is_empty() || digits.starts_with(['+', '-']) || digits.contains('_') {
                return None;
            }
            return BigInt::parse_bytes(digits.as_bytes(), radix);
        }
    }
    if text.contains('_') {
        return None;
    }
    BigInt::from_str(text).ok()
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else {
        (false, text.strip_prefix('+').unwrap_or(text))
    }
}

fn count_digits(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .map_or(0, |tail| tail.iter().take_while(|b| b.is_ascii_digit()).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn coerce(raw: Option<&str>, kind: PrimitiveKind) -> Option<FormValue> {
        coerce_scalar("f", raw, kind, false).expect("coerce")
    }

    #[test]
    fn strings_are_returned_verbatim() {
        assert_eq!(coerce(Some("Test"), PrimitiveKind::String), Some(FormValue::from("Test")));
        assert_eq!(coerce(Some(" x "), PrimitiveKind::Any), Some(FormValue::from(" x ")));
    }

    #[test]
    fn empty_input_is_null_only_when_nullable() {
        assert_eq!(
            coerce_scalar("f", Some(""), PrimitiveKind::Integer, true).expect("coerce"),
            Some(FormValue::Null)
        );
        assert_eq!(coerce(Some(""), PrimitiveKind::Integer), Some(FormValue::from("")));
        assert_eq!(coerce(Some(""), PrimitiveKind::String), Some(FormValue::from("")));
        assert_eq!(coerce(None, PrimitiveKind::Number), None);
        assert_eq!(
            coerce_scalar("f", None, PrimitiveKind::UnixTime, true).expect("coerce"),
            Some(FormValue::Null)
        );
    }

    #[test]
    fn booleans_follow_truthiness_with_false_literal() {
        assert_eq!(coerce(None, PrimitiveKind::Boolean), Some(FormValue::Bool(false)));
        assert_eq!(coerce(Some(""), PrimitiveKind::Boolean), Some(FormValue::Bool(false)));
        assert_eq!(coerce(Some("false"), PrimitiveKind::Boolean), Some(FormValue::Bool(false)));
        assert_eq!(coerce(Some("on"), PrimitiveKind::Boolean), Some(FormValue::Bool(true)));
        assert_eq!(coerce(Some("0"), PrimitiveKind::Boolean), Some(FormValue::Bool(true)));
        assert_eq!(coerce(Some("FALSE"), PrimitiveKind::Boolean), Some(FormValue::Bool(true)));
    }

    #[test]
    fn empty_boolean_is_false_even_when_nullable() {
        assert_eq!(
            coerce_scalar("f", Some(""), PrimitiveKind::Boolean, true).expect("coerce"),
            Some(FormValue::Bool(false))
        );
    }

    #[test]
    fn integers_parse_leading_digits() {
        assert_eq!(parse_int("42"), FormValue::Integer(42));
        assert_eq!(parse_int("  -7"), FormValue::Integer(-7));
        assert_eq!(parse_int("+3"), FormValue::Integer(3));
        assert_eq!(parse_int("12px"), FormValue::Integer(12));
        assert_eq!(parse_int("1.9"), FormValue::Integer(1));
        assert!(parse_int("nope").is_nan());
        assert!(parse_int("-").is_nan());
        assert_eq!(
            parse_int("99999999999999999999"),
            FormValue::Number(1e20)
        );
    }

    #[test]
    fn numbers_parse_leading_decimal_literal() {
        assert_eq!(parse_float("3.25"), FormValue::Number(3.25));
        assert_eq!(parse_float("-0.5abc"), FormValue::Number(-0.5));
        assert_eq!(parse_float(".5"), FormValue::Number(0.5));
        assert_eq!(parse_float("1e3"), FormValue::Number(1000.0));
        assert_eq!(parse_float("2e"), FormValue::Number(2.0));
        assert_eq!(parse_float("7."), FormValue::Number(7.0));
        assert_eq!(parse_float("-Infinity"), FormValue::Number(f64::NEG_INFINITY));
        assert!(parse_float(".").is_nan());
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn unparseable_numbers_are_nan_not_errors() {
        let value = coerce(Some("nope"), PrimitiveKind::Number).expect("value");
        assert!(value.is_nan());
        let value = coerce(Some("nope"), PrimitiveKind::Integer).expect("value");
        assert!(value.is_nan());
    }

    #[test]
    fn dates_accept_common_iso_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2024-03-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("2024-03-05T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_date("2024-03-05T10:30"), Some(expected));
        assert_eq!(
            parse_date("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn invalid_date_is_a_sentinel() {
        assert_eq!(coerce(Some("yesterday"), PrimitiveKind::UnixTime), Some(FormValue::InvalidDate));
    }

    #[test]
    fn bigints_parse_or_fail_with_syntax_error() {
        assert_eq!(
            coerce(Some("123456789012345678901234567890"), PrimitiveKind::BigInt),
            Some(FormValue::BigInt(
                BigInt::from_str("123456789012345678901234567890").unwrap()
            ))
        );
        assert_eq!(parse_bigint("0xff"), Some(BigInt::from(255)));
        assert_eq!(parse_bigint(" -12 "), Some(BigInt::from(-12)));
        assert_eq!(parse_bigint("1.5"), None);

        let err = coerce_scalar("big", Some("12abc"), PrimitiveKind::BigInt, false)
            .expect_err("syntax error");
        assert_eq!(
            err,
            FormError::BigIntSyntax {
                field: "big".to_string(),
                value: "12abc".to_string()
            }
        );
    }

    #[test]
    fn symbols_carry_the_text_as_description() {
        match coerce(Some("tok"), PrimitiveKind::Symbol) {
            Some(FormValue::Symbol(symbol)) => assert_eq!(symbol.description(), "tok"),
            other => panic!("expected symbol, got {other:?}"),
        }
    }

    #[test]
    fn structural_kinds_always_fail() {
        for kind in [PrimitiveKind::Array, PrimitiveKind::Set, PrimitiveKind::Object] {
            for raw in [None, Some(""), Some("x")] {
                let err = coerce_scalar("nested", raw, kind, true).expect_err("structural");
                assert!(err.is_schema_error());
                assert_eq!(err.field(), "nested");
            }
        }
        let err = coerce_scalar("o", Some("x"), PrimitiveKind::Object, false).expect_err("object");
        assert!(err.to_string().starts_with("Object type found."));
    }
}
