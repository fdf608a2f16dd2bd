//! Resolved parser/serializer configuration.
//!
//! Options are resolved by the caller before parsing and stay fixed for the
//! lifetime of a [`Document`](crate::Document), so cached renders can never
//! go stale against a mode flip.

/// How an attribute value is quoted when serialized.
///
/// `AsParsed` defers to the style detected while scanning (double quotes for
/// synthetic attributes); the document-wide
/// [`attribute_quote_override`](ParseOptions::attribute_quote_override) sits
/// between the two. See [`resolve_quote`](crate::resolve_quote).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuoteStyle {
    Double,
    Single,
    /// Value written with no quotes at all (`name=value`).
    Unquoted,
    /// Bare name, no `=` and no value (`readonly`).
    Omitted,
    #[default]
    AsParsed,
}

/// Tag/attribute name casing on output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputCase {
    /// The resolved (lowercase) name.
    #[default]
    Resolved,
    Upper,
    /// The name exactly as scanned.
    Original,
}

/// What to do with an end tag that matches no open element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnmatchedEndTagPolicy {
    /// Skip it (a debug diagnostic is logged).
    #[default]
    Drop,
    /// Keep its source text as a literal text node.
    AsText,
}

#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Hard bound on element nesting; exceeding it is a fatal
    /// [`HtmlError::TooDeep`](crate::HtmlError::TooDeep), at parse time and
    /// on every mutation attach.
    pub max_nested_depth: usize,
    /// At end of input, close remaining open elements by unwinding each one
    /// through the regular close path instead of stamping them closed
    /// against a synthetic end-of-stream marker.
    pub auto_close_on_end: bool,
    /// Name lookups and `name()` reads use the original casing as scanned.
    pub prefer_original_case: bool,
    /// Maintain the `id` attribute index incrementally.
    pub use_identifier_index: bool,
    /// Serialize as XML (entity-escaped text, forced quotes, CDATA).
    pub output_as_xml: bool,
    /// Leave `<p>` out of the implicit-closing rule.
    pub disable_implicit_p_closing: bool,
    /// Document-wide quote style, applied to attributes whose own style is
    /// `AsParsed`.
    pub attribute_quote_override: Option<QuoteStyle>,
    /// Skip entity decoding when materializing attribute values.
    pub backward_compatible_entity_decoding: bool,
    pub unmatched_end_tags: UnmatchedEndTagPolicy,
    /// Render void elements as `<br />` instead of `<br>` in HTML mode.
    pub self_close_void_elements: bool,
    pub output_case: OutputCase,
    /// Wrap raw-text element content in `<![CDATA[..]]>` in XML mode.
    pub use_cdata_sections: bool,
    /// Emit `<?xml version="1.0" ..?>` before an XML-mode document.
    pub emit_xml_declaration: bool,
    /// Encoding name written into the XML declaration.
    pub output_encoding: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_nested_depth: 512,
            auto_close_on_end: false,
            prefer_original_case: false,
            use_identifier_index: true,
            output_as_xml: false,
            disable_implicit_p_closing: false,
            attribute_quote_override: None,
            backward_compatible_entity_decoding: false,
            unmatched_end_tags: UnmatchedEndTagPolicy::default(),
            self_close_void_elements: false,
            output_case: OutputCase::default(),
            use_cdata_sections: true,
            emit_xml_declaration: false,
            output_encoding: None,
        }
    }
}
