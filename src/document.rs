//! Document queries over a scraper tree
//!
//! Selectors are CSS with an optional `::attr(name)` suffix. Every query runs
//! through a [`View`], the per-evaluation set of removed subtrees, so the
//! shared `Html` tree is never mutated.

use scraper::{ElementRef, Selector};

use crate::error::ConfigError;

/// Elements whose text never contributes to extracted content
const SKIPPED_TAGS: &[&str] = &["script", "style"];

/// A node produced by a query: an element, or one attribute of an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Matched<'a> {
    Element(ElementRef<'a>),
    Attribute { owner: ElementRef<'a>, value: &'a str },
}

impl<'a> Matched<'a> {
    pub fn element(&self) -> Option<ElementRef<'a>> {
        match self {
            Matched::Element(el) => Some(*el),
            Matched::Attribute { .. } => None,
        }
    }
}

/// Compiled selector expression
#[derive(Debug)]
pub struct Query {
    css: Option<Selector>,
    attribute: Option<String>,
}

impl Query {
    /// Parse `css`, `css::attr(name)` or `::attr(name)`
    pub fn parse(source: &str, path: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSelector {
            path: path.to_string(),
            selector: source.to_string(),
            reason,
        };

        let trimmed = source.trim();
        let (css_part, attribute) = match trimmed.rfind("::attr(") {
            Some(pos) => {
                let rest = &trimmed[pos + 7..];
                let name = rest
                    .strip_suffix(')')
                    .map(str::trim)
                    .filter(|name| !name.is_empty() && !name.contains(')'))
                    .ok_or_else(|| invalid("malformed ::attr() suffix".to_string()))?;
                (trimmed[..pos].trim(), Some(name.to_string()))
            }
            None => (trimmed, None),
        };

        let css = if css_part.is_empty() {
            None
        } else {
            Some(Selector::parse(css_part).map_err(|e| invalid(e.to_string()))?)
        };

        if css.is_none() && attribute.is_none() {
            return Err(invalid("empty selector".to_string()));
        }

        Ok(Self { css, attribute })
    }

    pub fn selects_attribute(&self) -> bool {
        self.attribute.is_some()
    }

    /// Matches in document order, hidden nodes filtered out
    pub fn select<'a>(&self, context: Matched<'a>, view: &View<'a>) -> Vec<Matched<'a>> {
        let elements: Vec<ElementRef<'a>> = match (&self.css, context) {
            (Some(selector), Matched::Element(el)) => el
                .select(selector)
                .filter(|found| !view.hides(*found))
                .collect(),
            (Some(_), Matched::Attribute { .. }) => return Vec::new(),
            (None, Matched::Element(el)) => vec![el],
            // An attribute has no attributes of its own
            (None, Matched::Attribute { .. }) => return Vec::new(),
        };

        match &self.attribute {
            None => elements.into_iter().map(Matched::Element).collect(),
            Some(name) => elements
                .into_iter()
                .filter_map(|owner| {
                    owner
                        .value()
                        .attr(name)
                        .map(|value| Matched::Attribute { owner, value })
                })
                .collect(),
        }
    }
}

/// Removed subtrees in effect for one rule evaluation.
///
/// Views chain to their parent, so a nested rule sees its own removals plus
/// everything removed above it, and nothing removed by its siblings.
#[derive(Debug, Default)]
pub struct View<'a> {
    removed: Vec<ElementRef<'a>>,
    parent: Option<&'a View<'a>>,
}

impl<'a> View<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn narrowed<'v>(&'v self, removed: Vec<ElementRef<'v>>) -> View<'v> {
        View {
            removed,
            parent: Some(self),
        }
    }

    fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.parent.map_or(true, View::is_empty)
    }

    /// Whether `el` itself is a removal root
    pub fn is_removed(&self, el: ElementRef<'a>) -> bool {
        self.removed.contains(&el) || self.parent.is_some_and(|p| p.is_removed(el))
    }

    /// Whether `el` lies inside any removed subtree
    pub fn hides(&self, el: ElementRef<'a>) -> bool {
        if self.is_empty() {
            return false;
        }
        self.is_removed(el)
            || el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| self.is_removed(ancestor))
    }
}

/// Elements matched by removal queries, evaluated against the unfiltered context
pub fn collect_removals<'a>(queries: &[Query], context: Matched<'a>) -> Vec<ElementRef<'a>> {
    let unfiltered = View::new();
    queries
        .iter()
        .flat_map(|query| query.select(context, &unfiltered))
        .filter_map(|found| found.element())
        .collect()
}

/// Accumulates text, optionally separating element boundaries by one space
struct TextBuilder {
    out: String,
    spaced: bool,
    at_boundary: bool,
}

impl TextBuilder {
    fn new(spaced: bool) -> Self {
        Self {
            out: String::new(),
            spaced,
            at_boundary: false,
        }
    }

    fn boundary(&mut self) {
        if self.spaced {
            self.at_boundary = true;
        }
    }

    fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.at_boundary
            && !self.out.is_empty()
            && !self.out.ends_with(char::is_whitespace)
            && !text.starts_with(char::is_whitespace)
        {
            self.out.push(' ');
        }
        self.at_boundary = false;
        self.out.push_str(text);
    }

    fn walk<'a>(&mut self, el: ElementRef<'a>, view: &View<'a>) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                self.push(text);
            } else if let Some(child_el) = ElementRef::wrap(child) {
                if SKIPPED_TAGS.contains(&child_el.value().name()) || view.is_removed(child_el) {
                    continue;
                }
                self.boundary();
                self.walk(child_el, view);
                self.boundary();
            }
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn collect_text<'a>(node: Matched<'a>, view: &View<'a>, spaced: bool) -> String {
    match node {
        Matched::Attribute { value, .. } => value.to_string(),
        Matched::Element(el) => {
            let mut builder = TextBuilder::new(spaced);
            builder.walk(el, view);
            builder.finish()
        }
    }
}

/// Concatenated descendant text, untrimmed
pub fn raw_text<'a>(node: Matched<'a>, view: &View<'a>) -> String {
    collect_text(node, view, false)
}

/// Descendant text with a single space at element joins, trimmed
pub fn spaced_text<'a>(node: Matched<'a>, view: &View<'a>) -> String {
    collect_text(node, view, true).trim().to_string()
}

/// Character count of the text preceding `node` among its siblings
pub fn text_above_length<'a>(node: Matched<'a>, view: &View<'a>) -> usize {
    let Some(el) = node.element() else {
        return 0;
    };

    let mut preceding: Vec<_> = el.prev_siblings().collect();
    preceding.reverse();

    let mut builder = TextBuilder::new(true);
    for sibling in preceding {
        if let Some(text) = sibling.value().as_text() {
            builder.push(text);
        } else if let Some(sibling_el) = ElementRef::wrap(sibling) {
            if SKIPPED_TAGS.contains(&sibling_el.value().name()) || view.hides(sibling_el) {
                continue;
            }
            builder.boundary();
            builder.walk(sibling_el, view);
            builder.boundary();
        }
    }
    builder.finish().trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first<'a>(doc: &'a Html, css: &str) -> Matched<'a> {
        let query = Query::parse(css, "test").unwrap();
        query.select(Matched::Element(doc.root_element()), &View::new())[0]
    }

    #[test]
    fn test_select_in_document_order() {
        let html = Html::parse_document(
            r#"
        <html>
        <body>
            <div class="price">$19.99</div>
            <div class="price">$29.99</div>
            <a href="/product/123" class="link">Product</a>
        </body>
        </html>
        "#,
        );

        let query = Query::parse(".price", "prices").unwrap();
        let found = query.select(Matched::Element(html.root_element()), &View::new());
        assert_eq!(found.len(), 2);
        assert_eq!(raw_text(found[0], &View::new()), "$19.99");
        assert_eq!(raw_text(found[1], &View::new()), "$29.99");
    }

    #[test]
    fn test_attribute_suffix() {
        let html = Html::parse_document(
            r#"<a href="/one" class="link">One</a><a class="link">No href</a><a href="/two" class="link">Two</a>"#,
        );

        let query = Query::parse("a.link::attr(href)", "links").unwrap();
        assert!(query.selects_attribute());

        let found = query.select(Matched::Element(html.root_element()), &View::new());
        let values: Vec<String> = found.iter().map(|m| raw_text(*m, &View::new())).collect();
        assert_eq!(values, vec!["/one", "/two"]);
    }

    #[test]
    fn test_attribute_of_context_node() {
        let html = Html::parse_document(r#"<meta property="width" content="1200">"#);
        let meta = first(&html, r#"meta[property="width"]"#);

        let query = Query::parse("::attr(content)", "width").unwrap();
        let found = query.select(meta, &View::new());
        assert_eq!(found.len(), 1);
        assert_eq!(raw_text(found[0], &View::new()), "1200");
    }

    #[test]
    fn test_invalid_selectors_are_rejected() {
        assert!(matches!(
            Query::parse("div[", "body"),
            Err(ConfigError::InvalidSelector { .. })
        ));
        assert!(Query::parse("a::attr(", "link").is_err());
        assert!(Query::parse("   ", "blank").is_err());
    }

    #[test]
    fn test_spaced_text_separates_elements() {
        let html = Html::parse_document(
            "<div id='content'><a href=''>A link</a>with adjacent text.</div>",
        );
        let div = first(&html, "#content");

        assert_eq!(raw_text(div, &View::new()), "A linkwith adjacent text.");
        assert_eq!(spaced_text(div, &View::new()), "A link with adjacent text.");
    }

    #[test]
    fn test_spaced_text_does_not_double_spaces() {
        let html =
            Html::parse_document("<div id='c'><p>First </p><p> Second</p>\n<p>Third</p></div>");
        let div = first(&html, "#c");
        assert_eq!(spaced_text(div, &View::new()), "First  Second\nThird");
    }

    #[test]
    fn test_script_and_style_are_skipped() {
        let html = Html::parse_document(
            "<div id='c'>Visible<script>var hidden = 1;</script><style>p {}</style></div>",
        );
        let div = first(&html, "#c");
        assert_eq!(raw_text(div, &View::new()), "Visible");
    }

    #[test]
    fn test_view_hides_removed_subtrees() {
        let html = Html::parse_document(
            r#"<div id="body"><p>Para1</p><div class="comments"><p>Comment</p></div><p>Para2</p></div>"#,
        );
        let body = first(&html, "#body");

        let removals = [Query::parse(".comments", "body").unwrap()];
        let removed = collect_removals(&removals, body);
        assert_eq!(removed.len(), 1);

        let root = View::new();
        let view = root.narrowed(removed);
        assert_eq!(spaced_text(body, &view), "Para1 Para2");

        let paragraphs = Query::parse("p", "body").unwrap();
        assert_eq!(paragraphs.select(body, &view).len(), 2);
        assert_eq!(paragraphs.select(body, &root).len(), 3);
    }

    #[test]
    fn test_text_above_length() {
        let html = Html::parse_document(
            r#"<div><p>Intro</p> text<ul id="a"><li>x</li></ul></div><div><ul id="b"><li>y</li></ul></div>"#,
        );

        let with_text = first(&html, "#a");
        assert_eq!(text_above_length(with_text, &View::new()), "Intro text".len());

        let without_text = first(&html, "#b");
        assert_eq!(text_above_length(without_text, &View::new()), 0);
    }
}
