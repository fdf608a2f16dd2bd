//! Rendering the tree back to markup, in HTML or XML mode.
//!
//! Reads only: the tree is never touched here (first-read caching lives in
//! `Document::outer_html`). Clean parsed subtrees short-circuit to source
//! slices in HTML mode; XML mode always renders, since source HTML is not
//! well-formed XML.

use crate::attribute::Attribute;
use crate::config::{OutputCase, QuoteStyle};
use crate::document::Document;
use crate::element_table::element_flags;
use crate::entities::{decode_entities, encode_entities, escape_quote};
use crate::node::{NodeId, NodeType};
use crate::tokenizer::MarkupKind;

/// Three-level attribute quote resolution: explicit per-attribute style
/// unless `AsParsed`, then the document-wide override, then the style
/// detected at parse time (double quotes for synthetic attributes).
pub fn resolve_quote(attr: &Attribute, doc_override: Option<QuoteStyle>) -> QuoteStyle {
    if attr.quote_style != QuoteStyle::AsParsed {
        return attr.quote_style;
    }
    if let Some(q) = doc_override {
        if q != QuoteStyle::AsParsed {
            return q;
        }
    }
    attr.detected_quote()
}

pub(crate) fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let xml = doc.options().output_as_xml;
    match doc.node_type(id) {
        NodeType::Document => write_document(doc, id, out),
        NodeType::Text => {
            let raw = doc.node(id).content.get(doc.source_text());
            if xml {
                out.push_str(&encode_entities(&decode_entities(raw)));
            } else {
                out.push_str(raw);
            }
        }
        NodeType::Comment => write_comment(doc, id, out),
        NodeType::Element => write_element(doc, id, out),
    }
}

/// Child render with the fast paths: cached markup, then (HTML mode) the
/// source slice of a clean parsed subtree.
fn write_child(doc: &Document, id: NodeId, out: &mut String) {
    let n = doc.node(id);
    if !n.dirty {
        if let Some(cached) = &n.cached_outer {
            out.push_str(cached);
            return;
        }
        if n.came_from_parse && !doc.options().output_as_xml {
            out.push_str(doc.outer_source(id));
            return;
        }
    }
    write_node(doc, id, out);
}

fn write_document(doc: &Document, id: NodeId, out: &mut String) {
    let opts = doc.options();
    if opts.output_as_xml && opts.emit_xml_declaration {
        out.push_str("<?xml version=\"1.0\"");
        if let Some(encoding) = &opts.output_encoding {
            out.push_str(" encoding=\"");
            out.push_str(encoding);
            out.push('"');
        }
        out.push_str("?>");
    }
    let children = doc.children(id);
    let element_roots = children
        .iter()
        .filter(|&&c| doc.node_type(c) == NodeType::Element)
        .count();
    // multiple root elements would be ill-formed XML
    let wrap = opts.output_as_xml && element_roots > 1;
    if wrap {
        out.push_str("<root>");
    }
    for &child in children {
        write_child(doc, child, out);
    }
    if wrap {
        out.push_str("</root>");
    }
}

fn write_comment(doc: &Document, id: NodeId, out: &mut String) {
    let n = doc.node(id);
    let content = n.content.get(doc.source_text());
    match n.markup {
        MarkupKind::Comment => {
            out.push_str("<!--");
            if doc.options().output_as_xml && content.contains("--") {
                // `--` is forbidden inside XML comments
                out.push_str(&content.replace("--", " - -"));
            } else {
                out.push_str(content);
            }
            out.push_str("-->");
        }
        MarkupKind::Doctype => {
            out.push_str("<!");
            out.push_str(content);
            out.push('>');
        }
        MarkupKind::ProcessingInstruction => {
            out.push_str("<?");
            out.push_str(content);
            out.push('>');
        }
    }
}

fn push_element_name(doc: &Document, id: NodeId, out: &mut String) {
    match doc.options().output_case {
        OutputCase::Resolved => out.push_str(doc.name(id)),
        OutputCase::Upper => out.push_str(&doc.name(id).to_ascii_uppercase()),
        OutputCase::Original => out.push_str(doc.original_name(id)),
    }
}

fn push_attribute_name(doc: &Document, attr: &Attribute, out: &mut String) {
    match doc.options().output_case {
        OutputCase::Resolved => out.push_str(attr.name(doc)),
        OutputCase::Upper => out.push_str(&attr.name(doc).to_ascii_uppercase()),
        OutputCase::Original => out.push_str(attr.original_name(doc)),
    }
}

fn write_element(doc: &Document, id: NodeId, out: &mut String) {
    let xml = doc.options().output_as_xml;
    let n = doc.node(id);
    let flags = element_flags(n.resolved_name(doc.source_text()));

    out.push('<');
    push_element_name(doc, id, out);
    for attr in &n.attributes {
        write_attribute(doc, attr, out);
    }

    if flags.void {
        if xml || doc.options().self_close_void_elements {
            out.push_str(" />");
        } else {
            out.push('>');
        }
        return;
    }
    if n.children.is_empty() {
        if xml {
            out.push_str(" />");
            return;
        }
        out.push('>');
        if !n.implicit_end {
            out.push_str("</");
            push_element_name(doc, id, out);
            out.push('>');
        }
        return;
    }

    out.push('>');
    if xml && flags.raw_text && doc.options().use_cdata_sections {
        out.push_str("<![CDATA[");
        for &child in &n.children {
            if doc.node_type(child) == NodeType::Text {
                out.push_str(doc.node(child).content.get(doc.source_text()));
            }
        }
        out.push_str("]]>");
    } else {
        for &child in &n.children {
            write_child(doc, child, out);
        }
    }
    // an implicitly closed element has no close tag to reproduce, but XML
    // output must be well-formed
    if !n.implicit_end || xml {
        out.push_str("</");
        push_element_name(doc, id, out);
        out.push('>');
    }
}

fn write_attribute(doc: &Document, attr: &Attribute, out: &mut String) {
    let xml = doc.options().output_as_xml;
    out.push(' ');
    push_attribute_name(doc, attr, out);

    let Some(raw) = attr.raw_value(doc.source_text()) else {
        // written without `=` in the source
        if xml {
            out.push_str("=\"\"");
        }
        return;
    };
    let resolved = resolve_quote(attr, doc.options().attribute_quote_override);

    if xml {
        // XML must quote; unquoted/omitted styles fall back to double
        let quote = if resolved == QuoteStyle::Single {
            '\''
        } else {
            '"'
        };
        let decoded = decode_entities(raw);
        let encoded = encode_entities(&decoded);
        out.push('=');
        out.push(quote);
        out.push_str(&escape_quote(&encoded, quote));
        out.push(quote);
        return;
    }

    match resolved {
        QuoteStyle::Omitted => {}
        QuoteStyle::Unquoted => {
            out.push('=');
            out.push_str(raw);
        }
        QuoteStyle::Single => {
            out.push_str("='");
            out.push_str(&escape_quote(raw, '\''));
            out.push('\'');
        }
        QuoteStyle::Double | QuoteStyle::AsParsed => {
            // resolve_quote never yields AsParsed; double is the fallback
            out.push_str("=\"");
            out.push_str(&escape_quote(raw, '"'));
            out.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;

    fn parse(html: &str) -> Document {
        Document::parse(html, ParseOptions::default()).expect("parse")
    }

    fn parse_with(html: &str, options: ParseOptions) -> Document {
        Document::parse(html, options).expect("parse")
    }

    #[test]
    fn quote_resolution_prefers_explicit_then_override_then_detected() {
        let mut attr = Attribute::new("a", "v");
        attr.detected_quote = QuoteStyle::Single;

        assert_eq!(resolve_quote(&attr, None), QuoteStyle::Single);
        assert_eq!(
            resolve_quote(&attr, Some(QuoteStyle::Unquoted)),
            QuoteStyle::Unquoted
        );
        assert_eq!(
            resolve_quote(&attr, Some(QuoteStyle::AsParsed)),
            QuoteStyle::Single
        );

        attr.quote_style = QuoteStyle::Double;
        assert_eq!(
            resolve_quote(&attr, Some(QuoteStyle::Unquoted)),
            QuoteStyle::Double
        );
    }

    #[test]
    fn rerender_preserves_quote_styles_and_bare_attributes() {
        let mut doc = parse(r#"<div a="1" b='2' c=3 d></div>"#);
        let div = doc.children(doc.root())[0];
        // force a re-render instead of the source-slice fast path
        doc.set_attribute_value(div, "e", "4").unwrap();
        assert_eq!(
            doc.outer_html(div),
            r#"<div a="1" b='2' c=3 d e="4"></div>"#
        );
    }

    #[test]
    fn attribute_override_rewrites_parsed_quotes() {
        let mut doc = parse_with(
            r#"<div a="1" b=2></div>"#,
            ParseOptions {
                attribute_quote_override: Some(QuoteStyle::Single),
                ..ParseOptions::default()
            },
        );
        let div = doc.children(doc.root())[0];
        doc.set_attribute_value(div, "c", "3").unwrap();
        assert_eq!(doc.outer_html(div), "<div a='1' b='2' c='3'></div>");
    }

    #[test]
    fn value_escapes_only_the_wrapping_quote() {
        let mut doc = Document::new(ParseOptions::default());
        let div = doc.create_element("div");
        doc.set_attribute_value(div, "t", "a\"b'c").unwrap();
        assert_eq!(doc.outer_html(div), "<div t=\"a&quot;b'c\"></div>");
    }

    #[test]
    fn output_case_policies_apply_to_rendered_tags() {
        let mut doc = parse_with(
            "<DiV Class=x>y</DiV>",
            ParseOptions {
                output_case: OutputCase::Upper,
                ..ParseOptions::default()
            },
        );
        let div = doc.children(doc.root())[0];
        doc.set_attribute_value(div, "z", "1").unwrap();
        assert_eq!(doc.outer_html(div), "<DIV CLASS=x Z=\"1\">y</DIV>");
    }

    #[test]
    fn xml_mode_escapes_text_and_quotes_attributes() {
        let mut doc = parse_with(
            "<div a=1>x &amp; y < z</div>",
            ParseOptions {
                output_as_xml: true,
                ..ParseOptions::default()
            },
        );
        let html = doc.to_html();
        assert_eq!(html, "<div a=\"1\">x &amp; y &lt; z</div>");
    }

    #[test]
    fn xml_mode_wraps_multiple_roots_and_emits_declaration() {
        let mut doc = parse_with(
            "<a>1</a><b>2</b>",
            ParseOptions {
                output_as_xml: true,
                emit_xml_declaration: true,
                output_encoding: Some("utf-8".to_string()),
                ..ParseOptions::default()
            },
        );
        assert_eq!(
            doc.to_html(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><root><a>1</a><b>2</b></root>"
        );
    }

    #[test]
    fn xml_mode_escapes_double_dash_in_comments() {
        let mut doc = parse_with(
            "<!--a--b-->",
            ParseOptions {
                output_as_xml: true,
                ..ParseOptions::default()
            },
        );
        assert_eq!(doc.to_html(), "<!--a - -b-->");
    }

    #[test]
    fn xml_mode_wraps_rawtext_in_cdata() {
        let mut doc = parse_with(
            "<script>if (a<b) {}</script>",
            ParseOptions {
                output_as_xml: true,
                ..ParseOptions::default()
            },
        );
        assert_eq!(doc.to_html(), "<script><![CDATA[if (a<b) {}]]></script>");
    }

    #[test]
    fn void_elements_self_close_per_policy() {
        let mut doc = parse_with(
            "<img src=x>",
            ParseOptions {
                self_close_void_elements: true,
                ..ParseOptions::default()
            },
        );
        let img = doc.children(doc.root())[0];
        doc.set_attribute_value(img, "alt", "y").unwrap();
        assert_eq!(doc.outer_html(img), "<img src=x alt=\"y\" />");
    }

    #[test]
    fn implicitly_closed_elements_render_without_close_tag() {
        let mut doc = parse("<p>A<p>B");
        let root = doc.root();
        let first = doc.children(root)[0];
        let text = doc.children(first)[0];
        doc.detach(text);
        let replacement = doc.create_text("C");
        doc.append_child(first, replacement).unwrap();
        assert_eq!(doc.outer_html(first), "<p>C");
    }
}
