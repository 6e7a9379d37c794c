//! Named value transformations
//!
//! A rule's pipeline is a list of transformation names resolved against a
//! [`Registry`] when the rule tree is bound. The registry comes preloaded with
//! the built-ins; callers add their own with [`Registry::register_fn`].

pub mod builtin;
pub mod culture;
pub mod date;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::document::{self, Matched, View};
use crate::error::TransformError;
use crate::value::Value;

pub use builtin::RegexExtract;
pub use date::ParseDate;

/// A matched document node together with the exclusions in effect for it
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub node: Matched<'a>,
    pub view: &'a View<'a>,
}

impl<'a> Target<'a> {
    /// Descendant text as it appears in the markup, untrimmed
    pub fn raw_text(&self) -> String {
        document::raw_text(self.node, self.view)
    }

    /// Descendant text with element boundaries separated by a space
    pub fn spaced_text(&self) -> String {
        document::spaced_text(self.node, self.view)
    }

    /// Value of the node when no transformation reads it: trimmed text for an
    /// element, the attribute value unchanged for an attribute
    pub fn default_text(&self) -> String {
        match self.node {
            Matched::Attribute { value, .. } => value.to_string(),
            Matched::Element(_) => self.raw_text().trim().to_string(),
        }
    }
}

/// What a transformation step receives
#[derive(Debug, Clone)]
pub enum Input<'a> {
    /// The matched node, before any step has turned it into a value
    Node(Target<'a>),
    Value(Value),
}

impl<'a> Input<'a> {
    pub fn into_value(self) -> Value {
        match self {
            Input::Node(target) => Value::String(target.default_text()),
            Input::Value(value) => value,
        }
    }

    /// Text view of the input; `None` for null, an error for containers
    pub fn into_text(self) -> Result<Option<String>, TransformError> {
        match self {
            Input::Node(target) => Ok(Some(target.default_text())),
            Input::Value(Value::Null) => Ok(None),
            Input::Value(value) => match value.to_text() {
                Some(text) => Ok(Some(text)),
                None => Err(TransformError::UnexpectedInput {
                    expected: "text",
                    actual: value.type_name().to_string(),
                }),
            },
        }
    }
}

/// Parameters of one pipeline step, keys without the leading underscore
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, JsonValue>);

impl Params {
    pub fn new(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// String parameter; present with another type is an error
    pub fn str(&self, key: &str) -> Result<Option<&str>, TransformError> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s)),
            Some(_) => Err(TransformError::InvalidParameter {
                name: key.to_string(),
                reason: "expected a string".to_string(),
            }),
        }
    }

    /// Reject keys outside `allowed`
    pub fn expect_only(&self, allowed: &[&str]) -> Result<(), TransformError> {
        match self.keys().find(|key| !allowed.contains(key)) {
            Some(key) => Err(TransformError::InvalidParameter {
                name: key.to_string(),
                reason: "unknown parameter".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A named step of a value pipeline.
///
/// Implementations are shared across threads by every extractor bound to
/// them and must not keep per-call state.
pub trait Transformation: Send + Sync {
    fn apply(&self, input: Input<'_>, params: &Params) -> Result<Value, TransformError>;

    /// Validate parameters once, when the rule is bound
    fn check(&self, _params: &Params) -> Result<(), TransformError> {
        Ok(())
    }
}

impl<F> Transformation for F
where
    F: Fn(Input<'_>, &Params) -> Result<Value, TransformError> + Send + Sync,
{
    fn apply(&self, input: Input<'_>, params: &Params) -> Result<Value, TransformError> {
        self(input, params)
    }
}

/// Registry of transformations by name
#[derive(Clone)]
pub struct Registry {
    transformations: HashMap<String, Arc<dyn Transformation>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            transformations: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in transformation
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a transformation, replacing any previous one with that name
    pub fn register<T>(&mut self, name: impl Into<String>, transformation: T) -> &mut Self
    where
        T: Transformation + 'static,
    {
        self.transformations
            .insert(name.into(), Arc::new(transformation));
        self
    }

    /// Register a closure
    ///
    /// ```ignore
    /// let mut registry = Registry::with_builtins();
    /// registry.register_fn("Uppercase", |input, _params| {
    ///     Ok(input.into_text()?.map(|t| t.to_uppercase()).into())
    /// });
    /// ```
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Input<'_>, &Params) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.register(name, f)
    }

    /// Look up `name`, falling back to `nameTransformation` and to `name`
    /// without a `Transformation` suffix
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Transformation>> {
        if let Some(found) = self.transformations.get(name) {
            return Some(Arc::clone(found));
        }
        let alternative = match name.strip_suffix("Transformation") {
            Some(stripped) => stripped.to_string(),
            None => format!("{}Transformation", name),
        };
        self.transformations.get(&alternative).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transformations.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("transformations", &self.names())
            .finish()
    }
}
