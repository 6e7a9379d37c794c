//! `ParseDate`: culture-aware date parsing
//!
//! With a `format` parameter the input must match a .NET-style custom
//! pattern (`dd.MM.yyyy`, `d MMMM yyyy HH:mm`, ...). Without one, ISO 8601
//! and RFC 2822 are tried first, then a word-and-number heuristic that uses
//! the culture's month names and default field order.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};

use super::culture::{Culture, DateOrder, INVARIANT};
use super::{Input, Params, Transformation};
use crate::error::TransformError;
use crate::value::Value;

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Two-digit years up to this value are read as 20xx, later ones as 19xx
const TWO_DIGIT_YEAR_MAX: u32 = 29;

/// Parses dates into `YYYY-MM-DDTHH:MM:SS` strings.
///
/// Output depends only on the input and parameters, with one exception:
/// a date without a year takes the current year from the local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseDate;

impl Transformation for ParseDate {
    fn apply(&self, input: Input<'_>, params: &Params) -> Result<Value, TransformError> {
        let culture = culture_param(params)?;
        let format = params.str("format")?.map(tokenize).transpose()?;

        let Some(text) = input.into_text()? else {
            return Ok(Value::Null);
        };

        let parsed = match &format {
            Some(tokens) => parse_exact(&text, tokens, culture),
            None => parse_loose(&text, culture),
        };

        parsed
            .map(|dt| Value::String(dt.format(OUTPUT_FORMAT).to_string()))
            .ok_or(TransformError::Unparseable {
                input: text,
                target: "date",
            })
    }

    fn check(&self, params: &Params) -> Result<(), TransformError> {
        params.expect_only(&["format", "culture"])?;
        culture_param(params)?;
        if let Some(format) = params.str("format")? {
            tokenize(format)?;
        }
        Ok(())
    }
}

fn culture_param(params: &Params) -> Result<&'static Culture, TransformError> {
    let name = params.str("culture")?.unwrap_or("");
    Culture::find(name).ok_or_else(|| TransformError::InvalidParameter {
        name: "culture".to_string(),
        reason: format!("unknown culture '{}'", name),
    })
}

fn invalid_format(reason: impl Into<String>) -> TransformError {
    TransformError::InvalidParameter {
        name: "format".to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Year(usize),
    /// 1-2 numeric, 3 abbreviated name, 4 full name
    Month(usize),
    /// 1-2 numeric, 3-4 weekday name
    Day(usize),
    Hour24(usize),
    Hour12(usize),
    Minute(usize),
    Second(usize),
    Fraction { digits: usize, optional: bool },
    Meridiem,
    DateSeparator,
    TimeSeparator,
    Whitespace,
    Literal(String),
}

fn tokenize(format: &str) -> Result<Vec<Token>, TransformError> {
    let chars: Vec<char> = format.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&d| d == c).count();
        let mut consumed = run;

        let token = match c {
            'y' => Token::Year(run),
            'M' => Token::Month(run.min(4)),
            'd' => Token::Day(run.min(4)),
            'H' => Token::Hour24(run.min(2)),
            'h' => Token::Hour12(run.min(2)),
            'm' => Token::Minute(run.min(2)),
            's' => Token::Second(run.min(2)),
            'f' | 'F' => {
                if run > 9 {
                    return Err(invalid_format("at most 9 fraction digits"));
                }
                Token::Fraction {
                    digits: run,
                    optional: c == 'F',
                }
            }
            't' => Token::Meridiem,
            '/' => {
                consumed = 1;
                Token::DateSeparator
            }
            ':' => {
                consumed = 1;
                Token::TimeSeparator
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&d| d == c)
                    .ok_or_else(|| invalid_format("unterminated quoted literal"))?;
                consumed = end + 2;
                Token::Literal(chars[i + 1..i + 1 + end].iter().collect())
            }
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| invalid_format("dangling escape"))?;
                consumed = 2;
                Token::Literal(escaped.to_string())
            }
            c if c.is_whitespace() => {
                consumed = chars[i..].iter().take_while(|d| d.is_whitespace()).count();
                Token::Whitespace
            }
            'z' | 'K' | 'g' => {
                return Err(invalid_format(format!("unsupported specifier '{}'", c)));
            }
            other => {
                consumed = 1;
                Token::Literal(other.to_string())
            }
        };

        tokens.push(token);
        i += consumed;
    }

    if tokens.is_empty() {
        return Err(invalid_format("empty format"));
    }
    Ok(tokens)
}

/// Byte length of the prefix of `text` equal to `prefix`, ignoring case
fn prefix_len_ignore_case(text: &str, prefix: &str) -> Option<usize> {
    let mut text_chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = text_chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(text_chars.next().map_or(text.len(), |(pos, _)| pos))
}

struct Cursor<'s> {
    rest: &'s str,
}

impl<'s> Cursor<'s> {
    fn number(&mut self, min: usize, max: usize) -> Option<u32> {
        let digits = self
            .rest
            .chars()
            .take(max)
            .take_while(char::is_ascii_digit)
            .count();
        if digits < min || digits == 0 {
            return None;
        }
        let (number, rest) = self.rest.split_at(digits);
        self.rest = rest;
        number.parse().ok()
    }

    fn literal(&mut self, literal: &str) -> bool {
        match prefix_len_ignore_case(self.rest, literal) {
            Some(len) => {
                self.rest = &self.rest[len..];
                true
            }
            None => false,
        }
    }

    fn whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Index of the longest candidate the input starts with
    fn one_of<'n>(&mut self, candidates: impl Iterator<Item = (usize, &'n str)>) -> Option<usize> {
        let (index, len) = candidates
            .filter(|(_, name)| !name.is_empty())
            .filter_map(|(index, name)| {
                prefix_len_ignore_case(self.rest, name).map(|len| (index, len))
            })
            .max_by_key(|(_, len)| *len)?;
        self.rest = &self.rest[len..];
        Some(index)
    }
}

/// Names with and without their abbreviation dot, tagged with their index
fn name_candidates<'n>(names: &'n [&'n str]) -> impl Iterator<Item = (usize, &'n str)> {
    names
        .iter()
        .enumerate()
        .flat_map(|(index, name)| [(index, *name), (index, name.trim_end_matches('.'))])
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    pm: Option<bool>,
}

impl Fields {
    fn build(self) -> Option<NaiveDateTime> {
        let year = self.year.unwrap_or_else(|| Local::now().year());
        let hour = match self.pm {
            Some(true) if self.hour < 12 => self.hour + 12,
            Some(false) if self.hour == 12 => 0,
            _ => self.hour,
        };
        NaiveDate::from_ymd_opt(year, self.month.unwrap_or(1), self.day.unwrap_or(1))?
            .and_hms_nano_opt(hour, self.minute, self.second, self.nanos)
    }
}

fn expand_year(value: u32, digits: usize) -> i32 {
    if digits > 2 {
        value as i32
    } else if value <= TWO_DIGIT_YEAR_MAX {
        2000 + value as i32
    } else {
        1900 + value as i32
    }
}

fn numeric_width(width: usize) -> (usize, usize) {
    if width >= 2 {
        (2, 2)
    } else {
        (1, 2)
    }
}

fn parse_exact(text: &str, tokens: &[Token], culture: &Culture) -> Option<NaiveDateTime> {
    let mut cursor = Cursor { rest: text.trim() };
    let mut fields = Fields::default();

    for token in tokens {
        match token {
            Token::Year(digits) => {
                let before = cursor.rest.len();
                let value = if *digits <= 2 {
                    cursor.number(1, 2)?
                } else {
                    cursor.number((*digits).min(4), (*digits).max(4))?
                };
                let read = before - cursor.rest.len();
                fields.year = Some(expand_year(value, read.max(*digits)));
            }
            Token::Month(width) if *width <= 2 => {
                let (min, max) = numeric_width(*width);
                fields.month = Some(cursor.number(min, max)?);
            }
            Token::Month(_) => {
                let index = cursor.one_of(
                    name_candidates(&culture.months)
                        .chain(name_candidates(&culture.abbreviated_months)),
                )?;
                fields.month = Some(index as u32 + 1);
            }
            Token::Day(width) if *width <= 2 => {
                let (min, max) = numeric_width(*width);
                fields.day = Some(cursor.number(min, max)?);
            }
            Token::Day(_) => {
                cursor.one_of(
                    name_candidates(&culture.days)
                        .chain(name_candidates(&culture.abbreviated_days)),
                )?;
            }
            Token::Hour24(width) | Token::Hour12(width) => {
                let (min, max) = numeric_width(*width);
                fields.hour = cursor.number(min, max)?;
            }
            Token::Minute(width) => {
                let (min, max) = numeric_width(*width);
                fields.minute = cursor.number(min, max)?;
            }
            Token::Second(width) => {
                let (min, max) = numeric_width(*width);
                fields.second = cursor.number(min, max)?;
            }
            Token::Fraction { digits, optional } => {
                let min = if *optional { 0 } else { *digits };
                let before = cursor.rest.len();
                match cursor.number(min.max(1), *digits) {
                    Some(value) => {
                        let read = (before - cursor.rest.len()) as u32;
                        fields.nanos = value * 10u32.pow(9 - read);
                    }
                    None if *optional => {}
                    None => return None,
                }
            }
            Token::Meridiem => {
                let designators = [
                    (0, culture.am),
                    (1, culture.pm),
                    (0, "AM"),
                    (1, "PM"),
                ];
                let index = cursor.one_of(designators.into_iter())?;
                fields.pm = Some(index == 1);
            }
            Token::DateSeparator => {
                if !cursor.literal(culture.date_separator) && !cursor.literal("/") {
                    return None;
                }
            }
            Token::TimeSeparator => {
                if !cursor.literal(":") {
                    return None;
                }
            }
            Token::Whitespace => cursor.whitespace(),
            Token::Literal(literal) => {
                if !cursor.literal(literal) {
                    return None;
                }
            }
        }
    }

    if !cursor.rest.trim().is_empty() {
        return None;
    }
    fields.build()
}

fn parse_loose(text: &str, culture: &Culture) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_iso(text).or_else(|| parse_words(text, culture))
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DateTime::parse_from_rfc2822(text)
        .ok()
        .map(|dt| dt.naive_local())
}

#[derive(Debug, Clone, Copy)]
struct Number {
    value: u32,
    digits: usize,
}

impl Number {
    fn looks_like_year(&self) -> bool {
        self.digits > 2 || self.value > 31
    }
}

/// Free-form dates such as `12 juin 2008`, `November 24, 2018 3:15 PM`
/// or `24/11/2018`
fn parse_words(text: &str, culture: &Culture) -> Option<NaiveDateTime> {
    let mut numbers: Vec<Number> = Vec::new();
    let mut month_name = None;
    let mut fallback_month = None;
    let mut fields = Fields::default();
    let mut has_time = false;

    let mut cursor = Cursor { rest: text };
    while let Some(c) = cursor.rest.chars().next() {
        if c.is_ascii_digit() {
            let before = cursor.rest.len();
            let value = cursor.number(1, 9)?;
            let digits = before - cursor.rest.len();

            if !has_time && cursor.rest.starts_with(':') {
                has_time = true;
                fields.hour = value;
                cursor.literal(":");
                fields.minute = cursor.number(1, 2)?;
                if cursor.literal(":") {
                    fields.second = cursor.number(1, 2)?;
                }
                if cursor.rest.starts_with('.') {
                    cursor.literal(".");
                    let before = cursor.rest.len();
                    let fraction = cursor.number(1, 9)?;
                    let read = (before - cursor.rest.len()) as u32;
                    fields.nanos = fraction * 10u32.pow(9 - read);
                }
                continue;
            }
            numbers.push(Number { value, digits });
        } else if c.is_alphabetic() {
            let len = cursor
                .rest
                .char_indices()
                .find(|(_, ch)| !ch.is_alphabetic())
                .map_or(cursor.rest.len(), |(pos, _)| pos);
            let word = &cursor.rest[..len];
            cursor.rest = &cursor.rest[len..];

            let is_day = culture.is_day_name(word) || INVARIANT.is_day_name(word);
            if let Some(month) = culture.month_from_name(word) {
                // `mar` is both martes and marzo in es-ES
                if is_day {
                    fallback_month.get_or_insert(month);
                } else {
                    month_name.get_or_insert(month);
                }
            } else if is_day {
                continue;
            } else if let Some(month) = INVARIANT.month_from_name(word) {
                fallback_month.get_or_insert(month);
            } else if let Some(pm) = culture.meridiem(word) {
                fields.pm = Some(pm);
            }
            // ordinal suffixes and filler words carry no field
        } else {
            cursor.rest = &cursor.rest[c.len_utf8()..];
        }
    }

    let (year, month, day) = match (month_name.or(fallback_month), numbers.as_slice()) {
        (Some(month), [day]) if !day.looks_like_year() => (None, month, *day),
        (Some(month), [first, second, ..]) => {
            if first.looks_like_year() {
                (Some(*first), month, *second)
            } else {
                (Some(*second), month, *first)
            }
        }
        (Some(_), _) => return None,
        (None, [first, second, third, ..]) => {
            let order = if first.looks_like_year() {
                DateOrder::YearMonthDay
            } else {
                culture.order
            };
            match order {
                DateOrder::YearMonthDay => (Some(*first), second.value, *third),
                DateOrder::MonthDayYear => (Some(*third), first.value, *second),
                DateOrder::DayMonthYear => (Some(*third), second.value, *first),
            }
        }
        (None, _) => return None,
    };

    fields.year = year.map(|y| expand_year(y.value, y.digits));
    fields.month = Some(month);
    fields.day = Some(day.value);
    fields.build()
}
