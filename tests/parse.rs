use htmldom::{Document, HtmlError, NodeType, ParseOptions, UnmatchedEndTagPolicy, parse};

fn first_element(doc: &Document) -> htmldom::NodeId {
    *doc.children(doc.root())
        .iter()
        .find(|&&c| doc.node_type(c) == NodeType::Element)
        .expect("document has an element child")
}

#[test]
fn well_formed_input_round_trips_verbatim() {
    let input = "<html><body class=\"a\"><p>hi &amp; bye</p><!--note--></body></html>";
    let mut doc = parse(input).unwrap();
    assert_eq!(doc.to_html(), input);

    let html = first_element(&doc);
    let outer = doc.outer_html(html);
    assert_eq!(outer, input);
}

#[test]
fn outer_html_of_inner_nodes_slices_the_source() {
    let input = "<div><span id=x>y</span></div>";
    let mut doc = parse(input).unwrap();
    let div = first_element(&doc);
    let span = doc.children(div)[0];
    assert_eq!(doc.outer_html(span), "<span id=x>y</span>");
    assert_eq!(doc.inner_html(span), "y");
    assert_eq!(doc.inner_html(div), "<span id=x>y</span>");
}

#[test]
fn rerender_is_idempotent_and_clears_dirty() {
    let mut doc = parse("<div>a</div>").unwrap();
    let div = first_element(&doc);
    doc.set_attribute_value(div, "x", "1").unwrap();
    assert!(doc.is_dirty(div));

    let once = doc.outer_html(div);
    assert!(!doc.is_dirty(div), "render clears the dirty flag");
    let twice = doc.outer_html(div);
    assert_eq!(once, twice);
    assert_eq!(once, "<div x=\"1\">a</div>");
}

#[test]
fn consecutive_p_tags_close_implicitly_into_siblings() {
    let doc = parse("<p>A<p>B").unwrap();
    let roots = doc.children(doc.root());
    assert_eq!(roots.len(), 2, "expected two sibling p elements");
    for (&p, text) in roots.iter().zip(["A", "B"]) {
        assert_eq!(doc.name(p), "p");
        let kids = doc.children(p);
        assert_eq!(kids.len(), 1);
        assert_eq!(doc.raw_text(kids[0]), Some(text));
    }
    assert!(doc.has_implicit_end(roots[0]));
}

#[test]
fn p_closing_can_be_disabled() {
    let doc = Document::parse(
        "<p>A<p>B",
        ParseOptions {
            disable_implicit_p_closing: true,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    let roots = doc.children(doc.root());
    assert_eq!(roots.len(), 1, "expected nested p elements");
    let outer = roots[0];
    let inner = *doc
        .children(outer)
        .iter()
        .find(|&&c| doc.node_type(c) == NodeType::Element)
        .expect("nested p");
    assert_eq!(doc.name(inner), "p");
}

#[test]
fn void_elements_never_take_children() {
    let doc = parse("<img src=\"x\"><span>y</span>").unwrap();
    let roots = doc.children(doc.root());
    assert_eq!(roots.len(), 2);
    let (img, span) = (roots[0], roots[1]);
    assert_eq!(doc.name(img), "img");
    assert!(doc.children(img).is_empty());
    assert_eq!(doc.name(span), "span");
    assert_eq!(doc.parent(span), Some(doc.root()), "span is a sibling");
    assert_eq!(doc.end_node(img), Some(img), "void closes against itself");
}

#[test]
fn rawtext_content_is_a_single_opaque_text_child() {
    let doc = parse("<script>if (a<b) {}</script>").unwrap();
    let script = first_element(&doc);
    assert_eq!(doc.name(script), "script");
    let kids = doc.children(script);
    assert_eq!(kids.len(), 1);
    assert_eq!(doc.node_type(kids[0]), NodeType::Text);
    assert_eq!(doc.raw_text(kids[0]), Some("if (a<b) {}"));
}

#[test]
fn depth_guard_rejects_pathological_nesting() {
    let input = "<a>".repeat(10);
    let err = Document::parse(
        input,
        ParseOptions {
            max_nested_depth: 3,
            ..ParseOptions::default()
        },
    )
    .unwrap_err();
    assert!(
        matches!(err, HtmlError::TooDeep { depth: 4, .. }),
        "expected depth error, got: {err:?}"
    );
}

#[test]
fn deep_but_allowed_nesting_builds_and_traverses() {
    let depth = 2_000usize;
    let mut input = String::with_capacity(depth * 9);
    for _ in 0..depth {
        input.push_str("<div>");
    }
    for _ in 0..depth {
        input.push_str("</div>");
    }
    let doc = Document::parse(
        input,
        ParseOptions {
            max_nested_depth: depth + 1,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    let seen = doc.descendants(doc.root()).count();
    assert_eq!(seen, depth);
    let innermost = doc
        .descendants(doc.root())
        .last()
        .expect("innermost element");
    assert_eq!(doc.depth(innermost), depth);
    assert!(doc.is_closed(innermost));
}

#[test]
fn tag_and_attribute_names_resolve_lowercase_by_default() {
    let doc = parse("<DIV CLASS=\"a\">x</DIV>").unwrap();
    let div = first_element(&doc);
    assert_eq!(doc.name(div), "div");
    assert_eq!(doc.original_name(div), "DIV");
    assert_eq!(doc.attribute_value(div, "class"), Some("a"));
    let attr = &doc.attributes(div)[0];
    assert_eq!(attr.name(&doc), "class");
    assert_eq!(attr.original_name(&doc), "CLASS");
}

#[test]
fn original_case_mode_keeps_scanned_names() {
    let doc = Document::parse(
        "<DIV CLASS=\"a\">x</DIV>",
        ParseOptions {
            prefer_original_case: true,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    let div = first_element(&doc);
    assert_eq!(doc.name(div), "DIV");
    assert!(doc.attribute_value(div, "class").is_none());
    assert_eq!(doc.attribute_value(div, "CLASS"), Some("a"));
}

#[test]
fn attribute_values_decode_entities_unless_compat_mode() {
    let input = "<a title=\"a &amp; b &#215; c\">";
    let doc = parse(input).unwrap();
    let a = first_element(&doc);
    assert_eq!(
        doc.attribute_value(a, "title"),
        Some("a & b \u{00D7} c")
    );

    let compat = Document::parse(
        input,
        ParseOptions {
            backward_compatible_entity_decoding: true,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    let a = first_element(&compat);
    assert_eq!(
        compat.attribute_value(a, "title"),
        Some("a &amp; b &#215; c")
    );
}

#[test]
fn bare_attributes_record_missing_equals() {
    let doc = parse("<input readonly disabled=\"\">").unwrap();
    let input = first_element(&doc);
    let attrs = doc.attributes(input);
    assert!(!attrs[0].had_equals_sign());
    assert_eq!(attrs[0].value(&doc), "");
    assert!(attrs[1].had_equals_sign());
    assert_eq!(attrs[1].value(&doc), "");
}

#[test]
fn unmatched_end_tags_drop_by_default() {
    let doc = parse("a</b>c").unwrap();
    let roots = doc.children(doc.root());
    assert_eq!(roots.len(), 2);
    assert_eq!(doc.raw_text(roots[0]), Some("a"));
    assert_eq!(doc.raw_text(roots[1]), Some("c"));
}

#[test]
fn unmatched_end_tags_can_become_text() {
    let doc = Document::parse(
        "a</b>c",
        ParseOptions {
            unmatched_end_tags: UnmatchedEndTagPolicy::AsText,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    let roots = doc.children(doc.root());
    assert_eq!(roots.len(), 3);
    assert_eq!(doc.raw_text(roots[1]), Some("</b>"));
}

#[test]
fn form_end_tag_leaves_inner_elements_open() {
    let doc = parse("<form><div></form><span>x</span>").unwrap();
    let form = first_element(&doc);
    assert_eq!(doc.name(form), "form");
    assert!(doc.is_closed(form));
    let div = doc.children(form)[0];
    assert_eq!(doc.name(div), "div");
    let span = *doc
        .children(div)
        .iter()
        .find(|&&c| doc.node_type(c) == NodeType::Element)
        .expect("span stays inside the still-open div");
    assert_eq!(doc.name(span), "span");
}

#[test]
fn end_of_input_closes_open_elements_under_both_policies() {
    for auto in [false, true] {
        let doc = Document::parse(
            "<div><span>x",
            ParseOptions {
                auto_close_on_end: auto,
                ..ParseOptions::default()
            },
        )
        .unwrap();
        let div = first_element(&doc);
        let span = doc.children(div)[0];
        assert!(doc.is_closed(div), "auto={auto}");
        assert!(doc.is_closed(span), "auto={auto}");
        assert!(doc.has_implicit_end(div), "auto={auto}");
        assert_eq!(doc.inner_length(span), 1, "auto={auto}");
    }
}

#[test]
fn nested_elements_close_eagerly_on_outer_end_tag() {
    let doc = parse("<div><b><i>x</div>").unwrap();
    let div = first_element(&doc);
    let b = doc.children(div)[0];
    let i = doc.children(b)[0];
    assert!(doc.is_closed(div));
    assert!(doc.is_closed(b), "descendant closed with the outer tag");
    assert!(doc.is_closed(i));
    assert!(doc.has_implicit_end(b));
    assert!(!doc.has_implicit_end(div), "div had a real end tag");
}

#[test]
fn positions_track_lines_and_offsets() {
    let doc = parse("ab\n<div id=x>\n<span>y</span></div>").unwrap();
    let div = first_element(&doc);
    assert_eq!(doc.line(div), 2);
    assert_eq!(doc.column(div), 1);
    assert_eq!(doc.stream_position(div), 3);
    assert_eq!(doc.outer_start(div), 3);

    let span = *doc
        .children(div)
        .iter()
        .find(|&&c| doc.node_type(c) == NodeType::Element)
        .expect("span child");
    assert_eq!(doc.line(span), 3);
    assert_eq!(doc.depth(span), doc.depth(div) + 1);
}

#[test]
fn inner_and_outer_spans_are_consistent() {
    let input = "<div><span>y</span></div>";
    let doc = parse(input).unwrap();
    let div = first_element(&doc);
    assert_eq!(doc.outer_start(div), 0);
    assert_eq!(doc.outer_length(div), input.len());
    assert_eq!(doc.inner_start(div), 5);
    assert_eq!(doc.inner_length(div), "<span>y</span>".len());
}

#[test]
fn doctype_and_comments_pass_through() {
    let input = "<!DOCTYPE html><!--c--><p>x</p>";
    let mut doc = parse(input).unwrap();
    let roots: Vec<_> = doc.children(doc.root()).to_vec();
    assert_eq!(doc.node_type(roots[0]), NodeType::Comment);
    assert_eq!(doc.name(roots[0]), "#comment");
    assert_eq!(doc.raw_text(roots[0]), Some("DOCTYPE html"));
    assert_eq!(doc.raw_text(roots[1]), Some("c"));
    assert_eq!(doc.to_html(), input);
}

#[test]
fn closing_attributes_are_kept_on_the_end_node() {
    let doc = parse("<div></div end>").unwrap();
    let div = first_element(&doc);
    let closing = doc.closing_attributes(div);
    assert_eq!(closing.len(), 1);
    assert_eq!(closing[0].name(&doc), "end");
}

#[test]
fn identifier_index_is_built_during_parse() {
    let doc = parse("<div id=\"a\"><span id=b></span></div>").unwrap();
    let div = first_element(&doc);
    let span = doc.children(div)[0];
    assert_eq!(doc.element_by_id("a").unwrap(), Some(div));
    assert_eq!(doc.element_by_id("b").unwrap(), Some(span));
    assert_eq!(doc.element_by_id("missing").unwrap(), None);
}

#[test]
fn inner_text_concatenates_descendant_text() {
    let doc = parse("<div>a<b>b</b><!--skip-->c &amp; d</div>").unwrap();
    let div = first_element(&doc);
    assert_eq!(doc.inner_text(div), "abc & d");
}

#[test]
fn textarea_and_title_are_rawtext_too() {
    let doc = parse("<title>a <b> c</title><textarea><div></textarea>").unwrap();
    let roots: Vec<_> = doc.children(doc.root()).to_vec();
    assert_eq!(doc.raw_text(doc.children(roots[0])[0]), Some("a <b> c"));
    assert_eq!(doc.raw_text(doc.children(roots[1])[0]), Some("<div>"));
}
