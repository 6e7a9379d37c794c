//! Built-in transformations

use regex::Regex;

use super::{Input, Params, ParseDate, Registry, Transformation};
use crate::error::TransformError;
use crate::rules::RegexGroup;
use crate::value::Value;

type TransformFn = fn(Input<'_>, &Params) -> Result<Value, TransformError>;

/// A built-in function with the parameter names it accepts
struct Builtin {
    apply: TransformFn,
    params: &'static [&'static str],
}

impl Transformation for Builtin {
    fn apply(&self, input: Input<'_>, params: &Params) -> Result<Value, TransformError> {
        (self.apply)(input, params)
    }

    fn check(&self, params: &Params) -> Result<(), TransformError> {
        params.expect_only(self.params)?;
        for name in self.params {
            params.str(name)?;
        }
        Ok(())
    }
}

const BUILTINS: &[(&str, TransformFn, &[&str])] = &[
    ("ExtractText", extract_text, &[]),
    ("HtmlDecode", html_decode, &[]),
    ("HtmlEncode", html_encode, &[]),
    ("UrlDecode", url_decode, &[]),
    ("UrlEncode", url_encode, &[]),
    ("RemoveExtraWhitespace", remove_extra_whitespace, &[]),
    ("Trim", trim, &[]),
    ("Split", split, &["separator"]),
    ("CastToInteger", cast_to_integer, &[]),
    ("CastToFloat", cast_to_float, &[]),
];

pub(crate) fn register_all(registry: &mut Registry) {
    for (name, apply, params) in BUILTINS {
        registry.register(
            *name,
            Builtin {
                apply: *apply,
                params: *params,
            },
        );
    }
    registry.register("ParseDate", ParseDate);
}

/// Apply `f` to the text of the input, passing null through
fn map_text(
    input: Input<'_>,
    f: impl FnOnce(String) -> Result<Value, TransformError>,
) -> Result<Value, TransformError> {
    match input.into_text()? {
        Some(text) => f(text),
        None => Ok(Value::Null),
    }
}

/// Visible text of a node with element boundaries spaced
pub fn extract_text(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    match input {
        Input::Node(target) => Ok(Value::String(target.spaced_text())),
        other => map_text(other, |text| Ok(Value::String(text))),
    }
}

pub fn html_decode(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    map_text(input, |text| {
        Ok(Value::String(
            html_escape::decode_html_entities(&text).into_owned(),
        ))
    })
}

/// Escapes `& < > " '`
pub fn html_encode(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    map_text(input, |text| {
        Ok(Value::String(
            html_escape::encode_quoted_attribute(&text).into_owned(),
        ))
    })
}

/// Percent-decoding where `+` also stands for a space
pub fn url_decode(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    map_text(input, |text| {
        let plus_as_space = text.replace('+', " ");
        let decoded = urlencoding::decode_binary(plus_as_space.as_bytes());
        Ok(Value::String(String::from_utf8_lossy(&decoded).into_owned()))
    })
}

/// Form encoding: spaces become `+`
pub fn url_encode(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    map_text(input, |text| {
        Ok(Value::String(
            url::form_urlencoded::byte_serialize(text.as_bytes()).collect(),
        ))
    })
}

/// Collapse whitespace runs to a single space and trim
pub fn remove_extra_whitespace(
    input: Input<'_>,
    _params: &Params,
) -> Result<Value, TransformError> {
    map_text(input, |text| {
        Ok(Value::String(
            text.split_whitespace().collect::<Vec<_>>().join(" "),
        ))
    })
}

pub fn trim(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    map_text(input, |text| Ok(Value::String(text.trim().to_string())))
}

/// Split on `separator` (default `,`) into trimmed, non-empty parts
pub fn split(input: Input<'_>, params: &Params) -> Result<Value, TransformError> {
    let separator = params.str("separator")?.unwrap_or(",");
    if separator.is_empty() {
        return Err(TransformError::InvalidParameter {
            name: "separator".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    map_text(input, |text| {
        Ok(Value::Array(
            text.split(separator)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(Value::from)
                .collect(),
        ))
    })
}

pub fn cast_to_integer(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    match input {
        Input::Value(Value::Integer(i)) => Ok(Value::Integer(i)),
        Input::Value(Value::Float(f))
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            Ok(Value::Integer(f as i64))
        }
        other => map_text(other, |text| {
            text.trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| TransformError::Unparseable {
                    input: text,
                    target: "integer",
                })
        }),
    }
}

pub fn cast_to_float(input: Input<'_>, _params: &Params) -> Result<Value, TransformError> {
    match input {
        Input::Value(Value::Float(f)) => Ok(Value::Float(f)),
        Input::Value(Value::Integer(i)) => Ok(Value::Float(i as f64)),
        other => map_text(other, |text| {
            text.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .ok_or(TransformError::Unparseable {
                    input: text,
                    target: "float",
                })
        }),
    }
}

/// Compiled regex with the capture group whose text is the result
#[derive(Debug, Clone)]
pub struct RegexExtract {
    regex: Regex,
    group: RegexGroup,
}

impl RegexExtract {
    pub fn compile(pattern: &str, group: RegexGroup) -> Result<Self, String> {
        let regex = Regex::new(pattern).map_err(|e| e.to_string())?;

        match &group {
            RegexGroup::Index(index) if *index >= regex.captures_len() => {
                return Err(format!(
                    "pattern has no capture group {} ({} groups)",
                    index,
                    regex.captures_len() - 1
                ));
            }
            RegexGroup::Name(name) if !regex.capture_names().flatten().any(|n| n == name) => {
                return Err(format!("pattern has no capture group named '{}'", name));
            }
            _ => {}
        }

        Ok(Self { regex, group })
    }

    /// Read `pattern` and optional `group` from step parameters
    pub fn from_params(params: &Params) -> Result<Self, TransformError> {
        params.expect_only(&["pattern", "group"])?;
        let pattern = params
            .str("pattern")?
            .ok_or_else(|| TransformError::InvalidParameter {
                name: "pattern".to_string(),
                reason: "required".to_string(),
            })?;

        let group = match params.get("group") {
            None => RegexGroup::default(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                TransformError::InvalidParameter {
                    name: "group".to_string(),
                    reason: "expected a group number or name".to_string(),
                }
            })?,
        };

        Self::compile(pattern, group).map_err(|reason| TransformError::InvalidParameter {
            name: "pattern".to_string(),
            reason,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Captured text of the first match, or null when nothing matches
    pub fn extract(&self, text: &str) -> Value {
        let Some(captures) = self.regex.captures(text) else {
            return Value::Null;
        };
        let group = match &self.group {
            RegexGroup::Index(index) => captures.get(*index),
            RegexGroup::Name(name) => captures.name(name),
        };
        group.map_or(Value::Null, |m| Value::from(m.as_str()))
    }

    pub fn apply(&self, input: Input<'_>) -> Result<Value, TransformError> {
        map_text(input, |text| Ok(self.extract(&text)))
    }
}
