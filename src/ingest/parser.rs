//! Record parser
//!
//! Turns one raw line of the form `KEY,DAY,HH:MM,VALUE` into a [`Record`].
//!
//! The scan is permissive: it stops at the first `\n` (or NUL)
//! and a line that ends before reaching the time field still produces a
//! record, with the missing fields left at zero. Only a key longer than six
//! characters or a stray byte in the day or time field rejects the line.
//! The value is read with "parse what you can" semantics: the longest
//! numeric prefix of the tail is used and an unreadable tail yields `0.0`.

use crate::ingest::ParseError;
use crate::storage::{GeohashKey, Record, GEOHASH_LEN};
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, preceded, tuple},
    IResult,
};

/// Parse one input line into a record
pub fn parse_record(line: &[u8]) -> Result<Record, ParseError> {
    let mut field = 0usize;
    let mut key = [0u8; GEOHASH_LEN];
    let mut key_len = 0usize;
    let mut day = 0u32;
    let mut hour = 0u32;
    let mut minute = 0u32;
    let mut in_minutes = false;
    let mut value = 0.0;

    for (pos, &c) in line.iter().enumerate() {
        if c == b'\n' || c == 0 {
            break;
        }

        if c == b',' {
            if field == 2 {
                value = parse_leading_f64(&line[pos + 1..]);
                break;
            }
            field += 1;
            continue;
        }

        match field {
            0 => {
                if key_len == GEOHASH_LEN {
                    return Err(ParseError::KeyTooLong);
                }
                key[key_len] = c;
                key_len += 1;
            }
            1 => {
                let digit = decimal_digit(c).ok_or(ParseError::InvalidDay { byte: c })?;
                day = accumulate(day, digit);
            }
            _ => {
                if c == b':' {
                    in_minutes = true;
                } else {
                    let digit = decimal_digit(c).ok_or(ParseError::InvalidTime { byte: c })?;
                    if in_minutes {
                        minute = accumulate(minute, digit);
                    } else {
                        hour = accumulate(hour, digit);
                    }
                }
            }
        }
    }

    // key_len <= GEOHASH_LEN is guaranteed by the scan above
    let key = GeohashKey::from_bytes(&key[..key_len]).ok_or(ParseError::KeyTooLong)?;

    Ok(Record::new(key, day, hour, minute, value))
}

fn decimal_digit(c: u8) -> Option<u32> {
    c.is_ascii_digit().then(|| (c - b'0') as u32)
}

/// `acc * 10 + digit`, saturating so oversized numbers stay oversized
fn accumulate(acc: u32, digit: u32) -> u32 {
    acc.saturating_mul(10).saturating_add(digit)
}

/// Read the longest floating point prefix of `bytes`, or `0.0` if none
///
/// Leading whitespace is skipped. Accepts an optional sign, decimal
/// mantissa with optional fraction, optional exponent, and the
/// `inf`/`infinity`/`nan` spellings.
pub fn parse_leading_f64(bytes: &[u8]) -> f64 {
    float_prefix(bytes)
        .ok()
        .and_then(|(_, literal)| std::str::from_utf8(literal).ok())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Recognize a float literal at the start of `input`
///
/// An exponent marker without digits is left unconsumed, so `1e` reads as `1`.
fn float_prefix(input: &[u8]) -> IResult<&[u8], &[u8]> {
    preceded(take_while(is_c_space), alt((special_float, decimal_float)))(input)
}

fn special_float(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(pair(
        opt(one_of("+-")),
        alt((tag_no_case("infinity"), tag_no_case("inf"), tag_no_case("nan"))),
    ))(input)
}

fn decimal_float(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

fn is_c_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}
