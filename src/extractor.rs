//! Rule tree binding and evaluation
//!
//! [`Extractor::new`] compiles a [`Rule`] tree once: selectors, removal
//! selectors and regexes are parsed, transformation names are resolved and
//! their parameters checked. The bound extractor is immutable and can be
//! shared across threads; each call builds its own exclusion view and result.

use std::fmt;
use std::sync::Arc;

use scraper::{ElementRef, Html};
use serde::{Serialize, Serializer};

use crate::document::{self, collect_removals, Matched, Query, View};
use crate::error::{ConfigError, Result, TransformError};
use crate::rules::{child_path, Rule, RuleKind};
use crate::transform::{Input, Params, RegexExtract, Registry, Target, Transformation};
use crate::value::{Map, Value};

/// Step names handled by the compiled regex step instead of the registry
const REGEX_STEP_NAMES: &[&str] = &["Regex", "RegexTransformation", "RegexExtract"];

/// Field attached to list items when the positional metric is enabled
pub const TEXT_ABOVE_LENGTH_FIELD: &str = "textAboveLength";

/// A transformation that failed while evaluating one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    /// Dotted rule path, `$.answers[].title`
    pub path: String,
    pub transformation: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: TransformError,
}

fn serialize_display<S: Serializer>(
    error: &TransformError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of an extraction together with its field-scoped failures
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub value: Value,
    pub failures: Vec<FieldFailure>,
}

enum Step {
    Regex(RegexExtract),
    Apply {
        name: String,
        transformation: Arc<dyn Transformation>,
        params: Params,
    },
}

impl Step {
    fn name(&self) -> &str {
        match self {
            Step::Regex(_) => "Regex",
            Step::Apply { name, .. } => name,
        }
    }

    fn apply(&self, input: Input<'_>) -> std::result::Result<Value, TransformError> {
        match self {
            Step::Regex(regex) => regex.apply(input),
            Step::Apply {
                transformation,
                params,
                ..
            } => transformation.apply(input, params),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Regex(regex) => f.debug_tuple("Regex").field(&regex.pattern()).finish(),
            Step::Apply { name, params, .. } => f
                .debug_struct("Apply")
                .field("name", name)
                .field("params", params)
                .finish(),
        }
    }
}

#[derive(Debug)]
enum Shape {
    Value,
    Object(Vec<(String, Bound)>),
    List(Box<Bound>),
}

/// A rule with everything compiled
#[derive(Debug)]
struct Bound {
    path: String,
    query: Option<Query>,
    removals: Vec<Query>,
    shape: Shape,
    steps: Vec<Step>,
    text_above_length: bool,
}

fn bind(rule: &Rule, path: &str, registry: &Registry) -> Result<Bound> {
    let query = rule
        .selector
        .as_deref()
        .map(|selector| Query::parse(selector, path))
        .transpose()?;

    let removals = rule
        .remove_selectors
        .iter()
        .map(|selector| -> Result<Query> {
            let query = Query::parse(selector, path)?;
            if query.selects_attribute() {
                return Err(ConfigError::InvalidSelector {
                    path: path.to_string(),
                    selector: selector.clone(),
                    reason: "removal selectors must select elements".to_string(),
                });
            }
            Ok(query)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut steps = Vec::new();
    if let (RuleKind::Regex, Some(spec)) = (rule.kind, &rule.regex) {
        let regex = RegexExtract::compile(&spec.pattern, spec.group.clone()).map_err(|reason| {
            ConfigError::InvalidRegex {
                path: path.to_string(),
                pattern: spec.pattern.clone(),
                reason,
            }
        })?;
        steps.push(Step::Regex(regex));
    }

    for spec in &rule.transformations {
        let params = Params::new(spec.params.clone());
        let invalid = |source: TransformError| ConfigError::InvalidParameters {
            path: path.to_string(),
            name: spec.name.clone(),
            source,
        };

        if REGEX_STEP_NAMES.contains(&spec.name.as_str()) {
            steps.push(Step::Regex(RegexExtract::from_params(&params).map_err(invalid)?));
            continue;
        }

        let transformation = registry.resolve(&spec.name).ok_or_else(|| {
            ConfigError::UnknownTransformation {
                path: path.to_string(),
                name: spec.name.clone(),
            }
        })?;
        transformation.check(&params).map_err(invalid)?;
        steps.push(Step::Apply {
            name: spec.name.clone(),
            transformation,
            params,
        });
    }

    let shape = match rule.kind {
        RuleKind::Scalar | RuleKind::Regex => Shape::Value,
        RuleKind::Object => Shape::Object(
            rule.children
                .iter()
                .map(|(name, child)| {
                    let bound = bind(child, &child_path(path, name), registry)?;
                    Ok((name.clone(), bound))
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        RuleKind::List => {
            let item = rule.item_template.as_deref().ok_or_else(|| ConfigError::InvalidRule {
                path: path.to_string(),
                reason: "list rule requires an item template".to_string(),
            })?;
            Shape::List(Box::new(bind(item, &format!("{}[]", path), registry)?))
        }
    };

    Ok(Bound {
        path: path.to_string(),
        query,
        removals,
        shape,
        steps,
        text_above_length: rule.text_above_length,
    })
}

impl Bound {
    fn evaluate<'a>(
        &self,
        context: Matched<'a>,
        view: &View<'a>,
        failures: &mut Vec<FieldFailure>,
    ) -> Value {
        let removed = collect_removals(&self.removals, context);
        let narrowed;
        let view: &View<'_> = if removed.is_empty() {
            view
        } else {
            narrowed = view.narrowed(removed);
            &narrowed
        };

        let matches = match &self.query {
            Some(query) => query.select(context, view),
            None => vec![context],
        };

        match &self.shape {
            Shape::Value => match matches.first() {
                Some(node) => self.run_pipeline(*node, view, failures),
                None => Value::Null,
            },
            Shape::Object(children) => match matches.first() {
                Some(node) => {
                    let mut fields = Map::new();
                    for (name, child) in children {
                        fields.insert(name.clone(), child.evaluate(*node, view, failures));
                    }
                    Value::Object(fields)
                }
                None => Value::Null,
            },
            Shape::List(item) => Value::Array(
                matches
                    .into_iter()
                    .map(|node| {
                        let value = item.evaluate(node, view, failures);
                        if self.text_above_length {
                            let length = document::text_above_length(node, view);
                            attach_text_above_length(value, length, item.is_object())
                        } else {
                            value
                        }
                    })
                    .collect(),
            ),
        }
    }

    fn is_object(&self) -> bool {
        matches!(self.shape, Shape::Object(_))
    }

    /// Run the steps over the matched node; any failure turns the field null
    fn run_pipeline<'a>(
        &self,
        node: Matched<'a>,
        view: &View<'a>,
        failures: &mut Vec<FieldFailure>,
    ) -> Value {
        let mut input = Input::Node(Target { node, view });

        for step in &self.steps {
            match step.apply(input) {
                Ok(Value::Null) => return Value::Null,
                Ok(value) => input = Input::Value(value),
                Err(error) => {
                    tracing::warn!(
                        path = %self.path,
                        transformation = step.name(),
                        %error,
                        "transformation failed, field set to null"
                    );
                    failures.push(FieldFailure {
                        path: self.path.clone(),
                        transformation: step.name().to_string(),
                        error,
                    });
                    return Value::Null;
                }
            }
        }

        input.into_value()
    }
}

fn attach_text_above_length(value: Value, length: usize, object_item: bool) -> Value {
    let metric = Value::Integer(length as i64);
    match value {
        Value::Object(mut fields) => {
            fields.insert(TEXT_ABOVE_LENGTH_FIELD.to_string(), metric);
            Value::Object(fields)
        }
        Value::Null if object_item => {
            let mut fields = Map::new();
            fields.insert(TEXT_ABOVE_LENGTH_FIELD.to_string(), metric);
            Value::Object(fields)
        }
        other => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), other);
            fields.insert(TEXT_ABOVE_LENGTH_FIELD.to_string(), metric);
            Value::Object(fields)
        }
    }
}

/// A rule tree bound to a transformation registry
#[derive(Debug)]
pub struct Extractor {
    root: Bound,
}

impl Extractor {
    /// Bind `rule` against the built-in transformations
    pub fn new(rule: &Rule) -> Result<Self> {
        Self::with_registry(rule, &Registry::with_builtins())
    }

    pub fn with_registry(rule: &Rule, registry: &Registry) -> Result<Self> {
        rule.validate()?;
        let root = bind(rule, "$", registry)?;
        tracing::debug!(fields = rule.children.len(), "bound extraction rules");
        Ok(Self { root })
    }

    /// Evaluate against the whole document
    pub fn extract(&self, document: &Html) -> Value {
        self.extract_element(document.root_element())
    }

    /// Evaluate with `element` as the root context
    pub fn extract_element(&self, element: ElementRef<'_>) -> Value {
        self.report(element).value
    }

    pub fn extract_html(&self, html: &str) -> Value {
        let document = Html::parse_document(html);
        self.extract(&document)
    }

    /// Evaluate and also return every field-scoped failure
    pub fn extract_with_report(&self, document: &Html) -> Extraction {
        self.report(document.root_element())
    }

    fn report(&self, element: ElementRef<'_>) -> Extraction {
        let mut failures = Vec::new();
        let view = View::new();
        let value = self
            .root
            .evaluate(Matched::Element(element), &view, &mut failures);

        tracing::debug!(failures = failures.len(), "extraction finished");
        Extraction { value, failures }
    }
}

/// Bind `rule` and evaluate it against `document`
pub fn extract(rule: &Rule, document: &Html) -> Result<Value> {
    Ok(Extractor::new(rule)?.extract(document))
}

/// Parse `html`, then bind and evaluate `rule`
pub fn extract_html(rule: &Rule, html: &str) -> Result<Value> {
    Ok(Extractor::new(rule)?.extract_html(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_ruleset;
    use crate::rules::{RegexGroup, TransformationSpec};

    fn run(ruleset: &str, html: &str) -> Value {
        let rule = parse_ruleset(ruleset).unwrap();
        extract_html(&rule, html).unwrap()
    }

    #[test]
    fn test_extract_text_transformation() {
        let html = "<html><body><div id='content'><a href=''>A link</a>with adjacent text.</div></body></html>";
        let result = run(
            r##"{"text": {"_selector": "#content", "_transformation": "ExtractTextTransformation"}}"##,
            html,
        );
        assert_eq!(result["text"], Value::from("A link with adjacent text."));
    }

    #[test]
    fn test_remove_extra_whitespace_after_decode() {
        let html = "<html><body><div id='content'><a href=''>A link</a>with     adjacent text. &quot;the final frontier&quot;</div></body></html>";
        let result = run(
            r##"{
                "text": {
                    "_selector": "#content",
                    "_transformations": [
                        "ExtractTextTransformation",
                        "HtmlDecodeTransformation",
                        "RemoveExtraWhitespaceTransformation"
                    ]
                }
            }"##,
            html,
        );
        assert_eq!(
            result["text"],
            Value::from("A link with adjacent text. \"the final frontier\"")
        );
    }

    #[test]
    fn test_html_encode_and_decode() {
        let result = run(
            r##"{"text": {"_selector": "#content", "_transformation": "HtmlEncodeTransformation"}}"##,
            "<html><body><div id='content'>a < b</div></body></html>",
        );
        assert_eq!(result["text"], Value::from("a &lt; b"));

        let result = run(
            r##"{"text": {"_selector": "#content", "_transformation": "HtmlDecode"}}"##,
            "<html><body><div id='content'>&amp;lt;a href=''&amp;gt;A link&amp;lt;/a&amp;gt;.</div></body></html>",
        );
        assert_eq!(result["text"], Value::from("<a href=''>A link</a>."));
    }

    #[test]
    fn test_url_transformations_on_attributes() {
        let result = run(
            r##"{"text": {"_selector": "#content a::attr(href)", "_transformation": "UrlDecodeTransformation"}}"##,
            "<html><body><div id='content'><a href='https://www.bing.com/search?q=hello+world'></a></div></body></html>",
        );
        assert_eq!(
            result["text"],
            Value::from("https://www.bing.com/search?q=hello world")
        );

        let result = run(
            r##"{"text": {"_selector": "#content a::attr(href)", "_transformation": "UrlEncodeTransformation"}}"##,
            "<html><body><div id='content'><a href='hello world'></a></div></body></html>",
        );
        assert_eq!(result["text"], Value::from("hello+world"));
    }

    #[test]
    fn test_cast_to_integer() {
        let result = run(
            r##"{"width": {"_selector": "meta[property='width']::attr(content)", "_transformation": "CastToIntegerTransformation"}}"##,
            r#"<meta property="width" content="1200">"#,
        );
        assert_eq!(result["width"], Value::Integer(1200));
        assert_eq!(result.to_json(), r#"{"width":1200}"#);
    }

    #[test]
    fn test_failed_transformation_is_field_scoped() {
        let rule = parse_ruleset(
            r##"{
                "width": {"_selector": ".width", "_transformation": "CastToInteger"},
                "published": {"_selector": ".date", "_transformation": "ParseDate"},
                "title": "h1"
            }"##,
        )
        .unwrap();
        let extractor = Extractor::new(&rule).unwrap();
        let document = Html::parse_document(
            "<h1>Title</h1><span class='width'>wide</span><span class='date'>someday</span>",
        );

        let report = extractor.extract_with_report(&document);
        assert!(report.value["width"].is_null());
        assert!(report.value["published"].is_null());
        assert_eq!(report.value["title"], Value::from("Title"));

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].path, "$.width");
        assert_eq!(report.failures[0].transformation, "CastToInteger");
        assert!(matches!(
            report.failures[0].error,
            TransformError::Unparseable { target: "integer", .. }
        ));
        assert_eq!(report.failures[1].path, "$.published");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["error"], "Cannot parse 'wide' as integer");
    }

    #[test]
    fn test_empty_matches() {
        let result = run(
            r##"{
                "missing": ".nothing",
                "items": {"_selector": ".nothing", "_isArray": true},
                "section": {"_selector": ".nothing", "title": "h2"}
            }"##,
            "<div>content</div>",
        );
        assert!(result["missing"].is_null());
        assert_eq!(result["items"], Value::Array(Vec::new()));
        assert!(result["section"].is_null());
        assert_eq!(result.to_json(), r#"{"missing":null,"items":[],"section":null}"#);
    }

    #[test]
    fn test_nested_objects_and_lists() {
        let html = r#"
            <div class="question"><h1>  What is Rust? </h1></div>
            <div class="answer"><span class="author">Ann</span><p>A language.</p></div>
            <div class="answer"><span class="author">Bo</span><p>Fast.</p></div>
            <a class="tag" href="/t/rust">rust</a><a class="tag" href="/t/lang">lang</a>
        "#;
        let result = run(
            r##"{
                "question": {"_selector": ".question", "title": "h1"},
                "answers": {
                    "_selector": ".answer",
                    "_isArray": true,
                    "author": ".author",
                    "content": "p"
                },
                "tags": {"_selector": "a.tag::attr(href)", "_isArray": true}
            }"##,
            html,
        );

        assert_eq!(result["question"]["title"], Value::from("What is Rust?"));
        assert_eq!(result["answers"].as_array().map(Vec::len), Some(2));
        assert_eq!(result["answers"][1]["author"], Value::from("Bo"));
        assert_eq!(result["answers"][0]["content"], Value::from("A language."));
        assert_eq!(
            result["tags"],
            Value::Array(vec![Value::from("/t/rust"), Value::from("/t/lang")])
        );

        let keys: Vec<&str> = result
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["question", "answers", "tags"]);
    }

    #[test]
    fn test_remove_selectors() {
        let html = r#"
            <html><body>
            <h1>Article <span class="ad">Sponsored</span> title</h1>
            <div class="article">
                <p>Para1 content</p>
                <div class="comments"><p>Comment 1</p><p>Comment 2</p></div>
                <p>Para2 content</p>
            </div>
            </body></html>
        "#;
        let result = run(
            r##"{
                "title": {"_selector": "h1", "_removeSelectors": ".ad"},
                "body": {
                    "_selector": "div.article",
                    "_removeSelectors": ["div.comments"],
                    "_transformations": ["ExtractText", "RemoveExtraWhitespace"]
                },
                "comments": {
                    "_selector": "div.article .comments p",
                    "_isArray": true
                }
            }"##,
            html,
        );

        assert_eq!(result["title"], Value::from("Article  title"));
        assert_eq!(result["body"], Value::from("Para1 content Para2 content"));
        assert_eq!(
            result["comments"],
            Value::Array(vec![Value::from("Comment 1"), Value::from("Comment 2")])
        );
    }

    #[test]
    fn test_removals_apply_to_descendant_rules() {
        let html = r#"
            <div class="post">
                <p class="line">keep</p>
                <div class="quote"><p class="line">quoted</p></div>
            </div>
        "#;
        let rule = Rule::object([(
            "post",
            Rule::object([("lines", Rule::list("p.line", Rule::context()))])
                .with_selector(".post")
                .removing(".quote"),
        )]);
        let result = extract_html(&rule, html).unwrap();
        assert_eq!(
            result["post"]["lines"],
            Value::Array(vec![Value::from("keep")])
        );
    }

    #[test]
    fn test_regex_rules() {
        let html = "<div class='date'>Posted on 2018-11-24 by admin</div><div class='id'>ref: AB-42</div>";
        let result = run(
            r##"{
                "year": {"_selector": ".date", "_regex": "(\\d{4})-\\d{2}"},
                "number": {"_selector": ".id", "_regex": "(?P<prefix>[A-Z]+)-(?P<num>\\d+)", "_group": "num", "_transformation": "CastToInteger"},
                "missing": {"_selector": ".date", "_regex": "version (\\d+)"}
            }"##,
            html,
        );
        assert_eq!(result["year"], Value::from("2018"));
        assert_eq!(result["number"], Value::Integer(42));
        assert!(result["missing"].is_null());
    }

    #[test]
    fn test_explicit_regex_step() {
        let rule = Rule::object([(
            "slug",
            Rule::scalar("a::attr(href)").with_transformation(
                TransformationSpec::new("Regex")
                    .with_param("pattern", r"/posts/([\w-]+)")
                    .with_param("group", 1),
            ),
        )]);
        let result = extract_html(&rule, r#"<a href="/posts/hello-world?x=1">Hi</a>"#).unwrap();
        assert_eq!(result["slug"], Value::from("hello-world"));
    }

    #[test]
    fn test_parse_date_rules() {
        let html = r#"
            <span class="us">11/24/2018</span>
            <span class="de">30.12.2011</span>
            <span class="fr">12 juin 2008</span>
        "#;
        let result = run(
            r##"{
                "parsedDateNoFormat": {"_selector": ".us", "_transformation": "ParseDate"},
                "parsedDateWithFormat": {
                    "_selector": ".de",
                    "_transformation": {"_type": "ParseDate", "_format": "dd.MM.yyyy"}
                },
                "parsedDateNoFormatWithProviderStyle": {
                    "_selector": ".fr",
                    "_transformation": {"_type": "ParseDateTransformation", "_culture": "fr-FR"}
                }
            }"##,
            html,
        );
        assert_eq!(result["parsedDateNoFormat"], Value::from("2018-11-24T00:00:00"));
        assert_eq!(result["parsedDateWithFormat"], Value::from("2011-12-30T00:00:00"));
        assert_eq!(
            result["parsedDateNoFormatWithProviderStyle"],
            Value::from("2008-06-12T00:00:00")
        );
    }

    #[test]
    fn test_text_above_length() {
        let html = r#"
            <div class="answer">
                <p>Here are some tips:</p>
                <ul><li>one</li><li>two</li></ul>
                <p>And more</p>
                <ol><li>three</li></ol>
            </div>
            <div class="answer"><ul><li>first thing</li></ul></div>
        "#;
        let result = run(
            r##"{
                "answers": {
                    "_selector": ".answer",
                    "_isArray": true,
                    "lists": {
                        "_selector": "ul, ol",
                        "_textAboveLength": true,
                        "_items": {"items": {"_selector": "li", "_isArray": true}}
                    }
                }
            }"##,
            html,
        );

        let first = result["answers"][0]["lists"].as_array().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(
            first[0]["items"],
            Value::Array(vec![Value::from("one"), Value::from("two")])
        );
        assert_eq!(
            first[0]["textAboveLength"],
            Value::Integer("Here are some tips:".len() as i64)
        );
        let second = first[1]["textAboveLength"].as_i64().unwrap();
        assert!(second > first[0]["textAboveLength"].as_i64().unwrap());

        let lone = &result["answers"][1]["lists"][0];
        assert_eq!(lone["textAboveLength"], Value::Integer(0));
    }

    #[test]
    fn test_text_above_length_wraps_scalar_items() {
        let rule = Rule::object([(
            "notes",
            Rule::list("li", Rule::context()).with_text_above_length(),
        )]);
        let result = extract_html(&rule, "<ul><li>a</li><li>b</li></ul>").unwrap();
        assert_eq!(result["notes"][0]["value"], Value::from("a"));
        assert_eq!(result["notes"][0]["textAboveLength"], Value::Integer(0));
        assert_eq!(result["notes"][1]["textAboveLength"], Value::Integer(1));
    }

    #[test]
    fn test_bind_errors() {
        let unknown = Rule::object([(
            "x",
            Rule::scalar("p").with_transformation("Frobnicate"),
        )]);
        match Extractor::new(&unknown) {
            Err(ConfigError::UnknownTransformation { path, name }) => {
                assert_eq!(path, "$.x");
                assert_eq!(name, "Frobnicate");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let bad_selector = Rule::object([("x", Rule::scalar("p[[").removing(".ad"))]);
        assert!(matches!(
            Extractor::new(&bad_selector),
            Err(ConfigError::InvalidSelector { .. })
        ));

        let attribute_removal = Rule::object([("x", Rule::scalar("p").removing("a::attr(href)"))]);
        assert!(matches!(
            Extractor::new(&attribute_removal),
            Err(ConfigError::InvalidSelector { .. })
        ));

        let bad_regex = Rule::object([("x", Rule::regex("p", "(unclosed", RegexGroup::default()))]);
        assert!(matches!(
            Extractor::new(&bad_regex),
            Err(ConfigError::InvalidRegex { .. })
        ));

        let bad_culture = Rule::object([(
            "x",
            Rule::scalar("p").with_transformation(
                TransformationSpec::new("ParseDate").with_param("culture", "xx-YY"),
            ),
        )]);
        assert!(matches!(
            Extractor::new(&bad_culture),
            Err(ConfigError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = Registry::with_builtins();
        registry.register_fn("Shout", |input, _params| {
            Ok(input.into_text()?.map(|t| t.to_uppercase()).into())
        });

        let rule = Rule::object([(
            "title",
            Rule::scalar("h1")
                .with_transformation("Trim")
                .with_transformation("ShoutTransformation"),
        )]);
        let extractor = Extractor::with_registry(&rule, &registry).unwrap();
        let result = extractor.extract_html("<h1> quiet </h1>");
        assert_eq!(result["title"], Value::from("QUIET"));

        assert!(Extractor::new(&rule).is_err());
    }

    #[test]
    fn test_extract_element_uses_given_context() {
        let document = Html::parse_document(
            "<div id='a'><h2>First</h2></div><div id='b'><h2>Second</h2></div>",
        );
        let selector = scraper::Selector::parse("#b").unwrap();
        let element = document.select(&selector).next().unwrap();

        let rule = Rule::object([("heading", Rule::scalar("h2"))]);
        let extractor = Extractor::new(&rule).unwrap();
        assert_eq!(
            extractor.extract_element(element)["heading"],
            Value::from("Second")
        );
        assert_eq!(extractor.extract(&document)["heading"], Value::from("First"));
    }

    #[test]
    fn test_extractor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Extractor>();
    }

    #[test]
    fn test_concurrent_extraction_matches_sequential() {
        let rule = parse_ruleset(
            r##"{
                "title": "h1",
                "body": {"_selector": ".body", "_removeSelectors": ".ad", "_transformation": "ExtractText"},
                "count": {"_selector": ".count", "_transformation": "CastToInteger"}
            }"##,
        )
        .unwrap();
        let extractor = Extractor::new(&rule).unwrap();

        let pages: Vec<String> = (0..16)
            .map(|i| {
                format!(
                    "<h1>Page {i}</h1><div class='body'><p>Text {i}</p><div class='ad'>Buy</div><p>End</p></div><span class='count'>{i}</span>"
                )
            })
            .collect();

        let sequential: Vec<String> = pages
            .iter()
            .map(|page| extractor.extract_html(page).to_json())
            .collect();

        let concurrent: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = pages
                .iter()
                .map(|page| {
                    let extractor = &extractor;
                    scope.spawn(move || extractor.extract_html(page).to_json())
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(sequential, concurrent);
        assert_eq!(
            sequential[3],
            r#"{"title":"Page 3","body":"Text 3 End","count":3}"#
        );
    }
}
