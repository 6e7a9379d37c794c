//! JSON ruleset loading
//!
//! A string is shorthand for a scalar rule with that selector. An object is a
//! rule whose `_`-prefixed keys are directives and whose other keys are child
//! fields, in declaration order:
//!
//! ```json
//! {
//!   "title": "h1",
//!   "body": {
//!     "_selector": "div.article",
//!     "_removeSelectors": ["div.comments"],
//!     "_transformations": ["ExtractText", "RemoveExtraWhitespace"]
//!   },
//!   "published": {
//!     "_selector": "time",
//!     "_transformation": { "_type": "ParseDate", "_format": "dd MMMM yyyy", "_culture": "fr-FR" }
//!   },
//!   "links": { "_selector": "a::attr(href)", "_isArray": true },
//!   "lists": {
//!     "_selector": "ul",
//!     "_textAboveLength": true,
//!     "_items": { "items": { "_selector": "li", "_isArray": true } }
//!   },
//!   "year": { "_selector": ".date", "_regex": "(\\d{4})" }
//! }
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::error::{ConfigError, Result};
use crate::rules::{child_path, RegexGroup, RegexSpec, Rule, RuleKind, TransformationSpec};

/// Parse a ruleset from JSON text
pub fn parse_ruleset(text: &str) -> Result<Rule> {
    let json: JsonValue = serde_json::from_str(text)?;
    ruleset_from_json(&json)
}

/// Read and parse a ruleset file
pub fn load_ruleset<P: AsRef<Path>>(path: P) -> Result<Rule> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!("Loaded ruleset from {}", path.display());
    parse_ruleset(&text)
}

/// Build a validated rule tree from an already parsed JSON document
pub fn ruleset_from_json(json: &JsonValue) -> Result<Rule> {
    let rule = rule_from_json(json, "$")?;
    if rule.kind != RuleKind::Object {
        return Err(invalid("$", "ruleset root must be an object with fields"));
    }
    rule.validate()?;
    Ok(rule)
}

fn invalid(path: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidRule {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn rule_from_json(json: &JsonValue, path: &str) -> Result<Rule> {
    match json {
        JsonValue::String(selector) => Ok(Rule::scalar(selector.as_str())),
        JsonValue::Object(map) => rule_from_object(map, path),
        other => Err(invalid(
            path,
            format!("expected a selector string or a rule object, got {}", json_type(other)),
        )),
    }
}

fn rule_from_object(map: &Map<String, JsonValue>, path: &str) -> Result<Rule> {
    let mut selector = None;
    let mut remove_selectors = Vec::new();
    let mut transformations = Vec::new();
    let mut items = None;
    let mut is_array = false;
    let mut pattern = None;
    let mut group = None;
    let mut text_above_length = false;
    let mut children = IndexMap::new();

    for (key, value) in map {
        match key.as_str() {
            "_selector" => selector = Some(expect_str(value, path, key)?.to_string()),
            "_removeSelectors" => remove_selectors = string_list(value, path, key)?,
            "_transformation" => transformations.push(transformation_from_json(value, path)?),
            "_transformations" => {
                let entries = value
                    .as_array()
                    .ok_or_else(|| invalid(path, "_transformations must be an array"))?;
                for entry in entries {
                    transformations.push(transformation_from_json(entry, path)?);
                }
            }
            "_items" => items = Some(rule_from_json(value, &format!("{}[]", path))?),
            "_isArray" => is_array = expect_bool(value, path, key)?,
            "_regex" => pattern = Some(expect_str(value, path, key)?.to_string()),
            "_group" => group = Some(group_from_json(value, path)?),
            "_textAboveLength" => text_above_length = expect_bool(value, path, key)?,
            directive if directive.starts_with('_') => {
                return Err(invalid(path, format!("unknown directive '{}'", directive)));
            }
            name => {
                let mut child = rule_from_json(value, &child_path(path, name))?;
                child.name = Some(name.to_string());
                children.insert(name.to_string(), child);
            }
        }
    }

    if group.is_some() && pattern.is_none() {
        return Err(invalid(path, "_group requires _regex"));
    }

    let mut rule = if let Some(pattern) = pattern {
        if items.is_some() || is_array || !children.is_empty() {
            return Err(invalid(path, "_regex cannot be combined with list or object fields"));
        }
        let mut rule = Rule::of_kind(RuleKind::Regex);
        rule.regex = Some(RegexSpec {
            pattern,
            group: group.unwrap_or_default(),
        });
        rule.transformations = transformations;
        rule
    } else if let Some(item) = items {
        if !children.is_empty() {
            return Err(invalid(path, "_items cannot be combined with child fields"));
        }
        if !transformations.is_empty() {
            return Err(invalid(path, "transformations belong on the _items template"));
        }
        let mut rule = Rule::of_kind(RuleKind::List);
        rule.item_template = Some(Box::new(item));
        rule
    } else if is_array {
        // The rule's own fields or transformations describe each item
        let mut item = if children.is_empty() {
            Rule::context()
        } else {
            let mut item = Rule::of_kind(RuleKind::Object);
            item.children = std::mem::take(&mut children);
            item
        };
        item.transformations = transformations;
        let mut rule = Rule::of_kind(RuleKind::List);
        rule.item_template = Some(Box::new(item));
        rule
    } else if !children.is_empty() {
        let mut rule = Rule::of_kind(RuleKind::Object);
        rule.children = children;
        rule.transformations = transformations;
        rule
    } else {
        let mut rule = Rule::context();
        rule.transformations = transformations;
        rule
    };

    rule.selector = selector;
    rule.remove_selectors = remove_selectors;
    rule.text_above_length = text_above_length;
    Ok(rule)
}

fn transformation_from_json(json: &JsonValue, path: &str) -> Result<TransformationSpec> {
    match json {
        JsonValue::String(name) => Ok(TransformationSpec::new(name.as_str())),
        JsonValue::Object(map) => {
            let name = map
                .get("_type")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| invalid(path, "transformation object requires a string _type"))?;
            let params = map
                .iter()
                .filter(|(key, _)| key.as_str() != "_type")
                .map(|(key, value)| (key.trim_start_matches('_').to_string(), value.clone()))
                .collect();
            Ok(TransformationSpec {
                name: name.to_string(),
                params,
            })
        }
        other => Err(invalid(
            path,
            format!("transformation must be a name or an object, got {}", json_type(other)),
        )),
    }
}

fn group_from_json(json: &JsonValue, path: &str) -> Result<RegexGroup> {
    match json {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|n| RegexGroup::Index(n as usize))
            .ok_or_else(|| invalid(path, "_group must be a non-negative integer")),
        JsonValue::String(name) => Ok(RegexGroup::Name(name.clone())),
        other => Err(invalid(
            path,
            format!("_group must be an integer or a name, got {}", json_type(other)),
        )),
    }
}

fn expect_str<'j>(json: &'j JsonValue, path: &str, key: &str) -> Result<&'j str> {
    json.as_str()
        .ok_or_else(|| invalid(path, format!("{} must be a string", key)))
}

fn expect_bool(json: &JsonValue, path: &str, key: &str) -> Result<bool> {
    json.as_bool()
        .ok_or_else(|| invalid(path, format!("{} must be a boolean", key)))
}

fn string_list(json: &JsonValue, path: &str, key: &str) -> Result<Vec<String>> {
    match json {
        JsonValue::String(s) => Ok(vec![s.clone()]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| expect_str(item, path, key).map(str::to_string))
            .collect(),
        _ => Err(invalid(path, format!("{} must be a string or an array of strings", key))),
    }
}

fn json_type(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
