//! Rule tree data model
//!
//! A [`Rule`] describes how to find one field and shape its value. Rules are
//! plain data: selectors and regexes are compiled when the tree is bound to
//! an [`Extractor`](crate::Extractor).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ConfigError;

/// How matched nodes become a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    Scalar,
    Object,
    List,
    Regex,
}

/// Capture group reference of a regex rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegexGroup {
    Index(usize),
    Name(String),
}

impl Default for RegexGroup {
    fn default() -> Self {
        RegexGroup::Index(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexSpec {
    pub pattern: String,
    #[serde(default)]
    pub group: RegexGroup,
}

/// One named transformation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationSpec {
    pub name: String,
    #[serde(default)]
    pub params: Map<String, JsonValue>,
}

impl TransformationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Single node of a rule tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Field name; `None` for the root and for list item templates
    pub name: Option<String>,
    /// Selector relative to the context node; `None` means the context node
    pub selector: Option<String>,
    pub kind: RuleKind,
    pub children: IndexMap<String, Rule>,
    pub item_template: Option<Box<Rule>>,
    pub remove_selectors: Vec<String>,
    pub transformations: Vec<TransformationSpec>,
    pub regex: Option<RegexSpec>,
    /// Attach `textAboveLength` to every item of a list rule
    pub text_above_length: bool,
}

impl Rule {
    pub(crate) fn of_kind(kind: RuleKind) -> Self {
        Self {
            name: None,
            selector: None,
            kind,
            children: IndexMap::new(),
            item_template: None,
            remove_selectors: Vec::new(),
            transformations: Vec::new(),
            regex: None,
            text_above_length: false,
        }
    }

    pub fn scalar(selector: impl Into<String>) -> Self {
        Self::of_kind(RuleKind::Scalar).with_selector(selector)
    }

    /// Scalar rule reading the context node itself
    pub fn context() -> Self {
        Self::of_kind(RuleKind::Scalar)
    }

    /// Object rule; children keep the given order
    pub fn object<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Rule)>,
        K: Into<String>,
    {
        let mut rule = Self::of_kind(RuleKind::Object);
        for (name, child) in children {
            rule = rule.with_child(name, child);
        }
        rule
    }

    pub fn list(selector: impl Into<String>, item: Rule) -> Self {
        let mut rule = Self::of_kind(RuleKind::List).with_selector(selector);
        rule.item_template = Some(Box::new(item));
        rule
    }

    pub fn regex(
        selector: impl Into<String>,
        pattern: impl Into<String>,
        group: RegexGroup,
    ) -> Self {
        let mut rule = Self::of_kind(RuleKind::Regex).with_selector(selector);
        rule.regex = Some(RegexSpec {
            pattern: pattern.into(),
            group,
        });
        rule
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, mut child: Rule) -> Self {
        let name = name.into();
        child.name = Some(name.clone());
        self.children.insert(name, child);
        self
    }

    pub fn with_transformation(mut self, spec: impl Into<TransformationSpec>) -> Self {
        self.transformations.push(spec.into());
        self
    }

    pub fn removing(mut self, selector: impl Into<String>) -> Self {
        self.remove_selectors.push(selector.into());
        self
    }

    pub fn with_text_above_length(mut self) -> Self {
        self.text_above_length = true;
        self
    }

    /// Check the structural invariants of this rule and its descendants
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_at("$")
    }

    pub(crate) fn validate_at(&self, path: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRule {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        match self.kind {
            RuleKind::Object if self.children.is_empty() => {
                return Err(invalid("object rule requires at least one child"));
            }
            RuleKind::List if self.item_template.is_none() => {
                return Err(invalid("list rule requires an item template"));
            }
            RuleKind::Regex if self.regex.is_none() => {
                return Err(invalid("regex rule requires a pattern"));
            }
            _ => {}
        }

        if self.kind != RuleKind::Regex && self.regex.is_some() {
            return Err(invalid("only regex rules may carry a pattern"));
        }
        if self.kind != RuleKind::List && self.text_above_length {
            return Err(invalid("textAboveLength applies to list rules only"));
        }
        if self.kind != RuleKind::Object && !self.children.is_empty() {
            return Err(invalid("only object rules may have children"));
        }
        if self.kind == RuleKind::Object && !self.transformations.is_empty() {
            return Err(invalid("object rules take no transformations"));
        }

        for (name, child) in &self.children {
            child.validate_at(&child_path(path, name))?;
        }
        if let Some(item) = &self.item_template {
            item.validate_at(&format!("{}[]", path))?;
        }
        Ok(())
    }
}

impl From<&str> for TransformationSpec {
    fn from(name: &str) -> Self {
        TransformationSpec::new(name)
    }
}

pub(crate) fn child_path(parent: &str, name: &str) -> String {
    format!("{}.{}", parent, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_record_names_in_order() {
        let rule = Rule::object([
            ("title", Rule::scalar("h1")),
            ("body", Rule::scalar("div.body").removing(".comments")),
            ("author", Rule::scalar(".author")),
        ]);

        let names: Vec<&str> = rule.children.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["title", "body", "author"]);
        assert_eq!(rule.children["body"].name.as_deref(), Some("body"));
        assert_eq!(rule.children["body"].remove_selectors, vec![".comments"]);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_object_requires_children() {
        let rule = Rule::object(Vec::<(String, Rule)>::new());
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("at least one child"));
    }

    #[test]
    fn test_list_requires_template() {
        let mut rule = Rule::list("li", Rule::context());
        rule.item_template = None;
        assert!(matches!(rule.validate(), Err(ConfigError::InvalidRule { .. })));
    }

    #[test]
    fn test_regex_requires_pattern() {
        let mut rule = Rule::regex("span", r"(\d+)", RegexGroup::default());
        assert!(rule.validate().is_ok());
        rule.regex = None;
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_text_above_length_only_on_lists() {
        let rule = Rule::scalar("p").with_text_above_length();
        assert!(rule.validate().is_err());

        let rule = Rule::list("ul", Rule::context()).with_text_above_length();
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_nested_error_reports_path() {
        let rule = Rule::object([(
            "answers",
            Rule::list("div.answer", Rule::object(Vec::<(String, Rule)>::new())),
        )]);
        match rule.validate() {
            Err(ConfigError::InvalidRule { path, .. }) => assert_eq!(path, "$.answers[]"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
