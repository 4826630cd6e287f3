//! Recursive node renderer.
//!
//! [`render`] is a single `match` over [`Node`]. Element open/close handling
//! and decoration flattening live in separate functions so the async renderer
//! in `stream::channel` emits byte-identical output by calling the same code
//! between its suspension points.

use crate::context::RenderContext;
use crate::error::{decode_utf8, Result};
use crate::escape::{escape_attribute, escape_text};
use crate::node::{AttributeMap, Conditional, Element, Node};
use crate::output::Output;
use crate::style::{intern_class_name, StyleEntry, StyleMap};
use crate::RenderConfig;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "button", "cite", "code", "data", "dfn", "em", "i", "img",
    "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span", "strong", "sub",
    "sup", "textarea", "time", "u", "var",
];

/// Elements that never have a closing tag.
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Elements rendered inline: no line breaks or indentation around them.
pub fn is_inline_tag(tag: &str) -> bool {
    INLINE_TAGS.contains(&tag)
}

/// Render `node` into `out`.
///
/// `ctx.attributes` and the indentation are back to their previous values
/// when this returns; style rules discovered along the way stay in `ctx`.
pub fn render(node: &Node, out: &mut impl Output, ctx: &mut RenderContext<'_>) {
    match node {
        Node::Element(element) => {
            let scope = begin_element(element, out, ctx);
            if let Some(child) = scope.child(element) {
                render(child, out, ctx);
            }
            end_element(element, scope, out, ctx);
        }
        Node::Text(text) => escape_text(text.as_bytes(), out),
        Node::Raw(bytes) => out.write_bytes(bytes),
        Node::Attributes { .. } | Node::Styled { .. } => {
            let (inner, saved) = begin_decoration(node, ctx);
            render(inner, out, ctx);
            ctx.attributes = saved;
        }
        Node::Array(items) => {
            for item in items {
                render(item, out, ctx);
            }
        }
        Node::Tuple(items) => {
            let saved = ctx.attributes.clone();
            for item in items {
                render(item, out, ctx);
                if ctx.attributes != saved {
                    ctx.attributes.clone_from(&saved);
                }
            }
        }
        Node::Conditional(Conditional::First(node) | Conditional::Second(node)) => {
            render(node, out, ctx)
        }
        Node::Empty => {}
    }
}

/// State saved when an element opens and restored when it closes.
#[derive(Debug)]
pub(crate) struct ElementScope {
    saved_attributes: AttributeMap,
    saved_indentation: usize,
    saved_preformatted: bool,
    block: bool,
    void: bool,
}

impl ElementScope {
    /// The child to render, if any; void elements drop their content.
    pub(crate) fn child<'n>(&self, element: &'n Element) -> Option<&'n Node> {
        if self.void {
            return None;
        }
        element.child.as_deref()
    }
}

/// Write the opening tag and enter the element's scope.
///
/// Pending attributes are consumed by this element; its own attributes are
/// layered on top of them (they sit closer to the content), with class lists
/// concatenated.
pub(crate) fn begin_element(
    element: &Element,
    out: &mut impl Output,
    ctx: &mut RenderContext<'_>,
) -> ElementScope {
    let block = !is_inline_tag(&element.tag);
    let void = is_void_tag(&element.tag);
    let saved_attributes = std::mem::take(&mut ctx.attributes);

    if block {
        ctx.line_break(out);
    }
    out.write_byte(b'<');
    out.write_str(&element.tag);
    if element.attributes.is_empty() {
        write_attributes(&saved_attributes, out);
    } else if saved_attributes.is_empty() {
        write_attributes(&element.attributes, out);
    } else {
        let mut merged = saved_attributes.clone();
        merged.merge(&element.attributes);
        write_attributes(&merged, out);
    }
    out.write_byte(b'>');

    let saved_indentation = ctx.current_indentation.len();
    let saved_preformatted = ctx.preformatted;
    if !void {
        if element.tag == "pre" {
            ctx.preformatted = true;
        } else if block {
            ctx.push_indentation();
        }
    }

    ElementScope {
        saved_attributes,
        saved_indentation,
        saved_preformatted,
        block,
        void,
    }
}

/// Write the closing tag (if any) and restore the state saved by
/// [`begin_element`].
pub(crate) fn end_element(
    element: &Element,
    scope: ElementScope,
    out: &mut impl Output,
    ctx: &mut RenderContext<'_>,
) {
    ctx.restore_indentation(scope.saved_indentation);
    ctx.preformatted = scope.saved_preformatted;
    if !scope.void {
        if scope.block && element.tag != "pre" {
            ctx.line_break(out);
        }
        out.write_bytes(b"</");
        out.write_str(&element.tag);
        out.write_byte(b'>');
    }
    ctx.attributes = scope.saved_attributes;
}

fn write_attributes(attributes: &AttributeMap, out: &mut impl Output) {
    for (name, value) in attributes.iter() {
        out.write_byte(b' ');
        out.write_str(name);
        if !value.is_empty() {
            out.write_bytes(b"=\"");
            escape_attribute(value.as_bytes(), out);
            out.write_byte(b'"');
        }
    }
}

/// Flatten a chain of `Styled`/`Attributes` wrappers.
///
/// Walks the chain outer to inner once, collecting style entries and
/// attribute layers. Entries are collected in reverse application order (the
/// outermost wrapper was applied last), so the list is reversed before class
/// names are assigned. The combined class list is built once and merged into
/// `ctx.attributes` together with the attribute layers, inner layers winning.
///
/// Returns the innermost non-decoration node and the attributes to restore
/// after it has been rendered.
pub(crate) fn begin_decoration<'n>(
    node: &'n Node,
    ctx: &mut RenderContext<'_>,
) -> (&'n Node, AttributeMap) {
    let mut entries: Vec<&StyleEntry> = Vec::new();
    let mut layers: Vec<&AttributeMap> = Vec::new();
    let mut current = node;
    loop {
        match current {
            Node::Styled { inner, styles } => {
                entries.extend(styles.iter().rev());
                current = &**inner;
            }
            Node::Attributes { inner, attributes } => {
                layers.push(attributes);
                current = &**inner;
            }
            _ => break,
        }
    }
    entries.reverse();

    let saved = ctx.attributes.clone();
    for layer in layers {
        ctx.attributes.merge(layer);
    }
    if !entries.is_empty() {
        let mut classes = String::new();
        for entry in entries {
            let name = intern_class_name(ctx, entry);
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(&name);
        }
        ctx.attributes.append_classes(&classes);
    }

    (current, saved)
}

/// Render a fragment with a fresh context.
pub fn render_fragment(node: &Node, config: &RenderConfig) -> Vec<u8> {
    render_fragment_with_styles(node, config).0
}

/// Render a fragment and hand back the style rules it produced, for callers
/// that ship the stylesheet separately.
pub fn render_fragment_with_styles(node: &Node, config: &RenderConfig) -> (Vec<u8>, StyleMap) {
    let mut ctx = RenderContext::new(config);
    let mut out = Vec::with_capacity(config.reserved_capacity);
    render(node, &mut out, &mut ctx);
    (out, ctx.into_styles())
}

pub fn render_fragment_string(node: &Node, config: &RenderConfig) -> Result<String> {
    decode_utf8(render_fragment(node, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(node: &Node) -> String {
        render_fragment_string(node, &RenderConfig::default()).unwrap()
    }

    fn pretty(node: &Node) -> String {
        render_fragment_string(node, &RenderConfig::pretty()).unwrap()
    }

    #[test]
    fn paragraph_with_escaped_text() {
        let node = Node::element("p", "a < b & c");
        assert_eq!(html(&node), "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn raw_is_not_escaped() {
        let node = Node::element("div", Node::raw("<b>&nbsp;</b>"));
        assert_eq!(html(&node), "<div><b>&nbsp;</b></div>");
    }

    #[test]
    fn void_tags_ignore_content() {
        let node = Node::element("br", "ignored");
        assert_eq!(html(&node), "<br>");
        let img = Element::new("img").with_attribute("src", "a.png");
        let img = img.with_child("alt");
        assert_eq!(html(&img.into()), r#"<img src="a.png">"#);
    }

    #[test]
    fn empty_attribute_value_is_bare() {
        let node = Node::void("input").attribute("disabled", "");
        assert_eq!(html(&node), "<input disabled>");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let node = Node::element("a", "x").attribute("title", r#"say "hi" & <bye>"#);
        assert_eq!(
            html(&node),
            r#"<a title="say &quot;hi&quot; &amp; &lt;bye&gt;">x</a>"#
        );
    }

    #[test]
    fn sibling_styles_share_one_class() {
        let red = StyleEntry::new("color", "red");
        let node = Node::array([
            Node::element("p", "a").style(red.clone()),
            Node::element("p", "b").style(red),
        ]);
        let (bytes, styles) = render_fragment_with_styles(&node, &RenderConfig::default());
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"<p class="color-0">a</p><p class="color-0">b</p>"#
        );
        assert_eq!(styles.len(), 1);
    }

    #[test]
    fn style_chain_flattens_in_application_order() {
        let node = Node::element("div", "x")
            .style(StyleEntry::new("color", "red"))
            .style(StyleEntry::new("margin", "0"))
            .styles([
                StyleEntry::new("padding", "1px"),
                StyleEntry::new("border", "none"),
            ]);
        assert_eq!(
            html(&node),
            r#"<div class="color-0 margin-1 padding-2 border-3">x</div>"#
        );
    }

    #[test]
    fn inner_attribute_wins_on_collision() {
        let node = Node::element("div", "x")
            .attribute("id", "inner")
            .attribute("id", "outer")
            .attribute("title", "t");
        assert_eq!(html(&node), r#"<div title="t" id="inner">x</div>"#);
    }

    #[test]
    fn element_attributes_merge_with_wrappers() {
        let el = Element::new("div")
            .with_attribute("class", "card")
            .with_attribute("id", "own")
            .with_child("x");
        let node = Node::from(el)
            .attribute("id", "wrapper")
            .attribute("data-k", "v")
            .style(StyleEntry::new("color", "red"));
        assert_eq!(
            html(&node),
            r#"<div data-k="v" id="own" class="color-0 card">x</div>"#
        );
    }

    #[test]
    fn attributes_do_not_reach_children() {
        let node = Node::element("div", Node::element("span", "x")).attribute("id", "a");
        assert_eq!(html(&node), r#"<div id="a"><span>x</span></div>"#);
    }

    #[test]
    fn tuple_siblings_each_receive_wrapper_attributes() {
        let pair = Node::tuple([Node::element("b", "1"), Node::element("i", "2")]);
        let node = pair.attribute("class", "k");
        assert_eq!(html(&node), r#"<b class="k">1</b><i class="k">2</i>"#);
    }

    #[test]
    fn conditional_renders_one_branch() {
        assert_eq!(html(&Node::either(true, "yes", "no")), "yes");
        assert_eq!(html(&Node::either(false, "yes", "no")), "no");
        assert_eq!(html(&Node::optional(None)), "");
    }

    #[test]
    fn pretty_block_and_inline() {
        let node = Node::element(
            "div",
            Node::array([Node::element("p", Node::element("span", "hi")), Node::void("br")]),
        );
        assert_eq!(
            pretty(&node),
            "\n<div>\n  <p><span>hi</span>\n  </p>\n  <br>\n</div>"
        );
    }

    #[test]
    fn pre_preserves_whitespace() {
        let node = Node::element(
            "section",
            Node::element("pre", Node::array([Node::text("a\n  b"), Node::element("div", "c")])),
        );
        assert_eq!(
            pretty(&node),
            "\n<section>\n  <pre>a\n  b<div>c</div></pre>\n</section>"
        );
    }

    #[test]
    fn context_is_restored_after_render() {
        let config = RenderConfig::pretty();
        let mut ctx = RenderContext::new(&config);
        ctx.attributes.set("id", "pending");
        let node = Node::element("div", Node::element("p", "x"))
            .attribute("title", "t")
            .style(StyleEntry::new("color", "red"));
        let mut out = Vec::new();
        render(&node, &mut out, &mut ctx);
        assert_eq!(ctx.pending_attributes().get("id"), Some("pending"));
        assert_eq!(ctx.pending_attributes().len(), 1);
        assert_eq!(ctx.current_indentation(), "");
        assert_eq!(ctx.styles().len(), 1);
    }

    #[test]
    fn sequential_names_reset_between_renders() {
        let node = Node::element("p", "x").style(StyleEntry::new("color", "blue"));
        assert_eq!(html(&node), html(&node));
        assert_eq!(html(&node), r#"<p class="color-0">x</p>"#);
    }
}
