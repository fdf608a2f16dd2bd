//! Per-tag-name behavior flags.
//!
//! A process-wide constant classification; there is intentionally no way to
//! mutate it at runtime.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElementFlags {
    /// Cannot contain children and has no closing tag (`img`, `br`, ...).
    pub void: bool,
    /// Content is not tag-scanned; only the literal matching end tag ends it
    /// (`script`, `style`, `textarea`, `title`).
    pub raw_text: bool,
    /// A new start tag of the same name closes the previous still-open one
    /// (`br`; `p` unless disabled by configuration).
    pub implicit_close: bool,
    /// Its end tag does not force closure of elements opened inside it
    /// (`form`).
    pub overlap: bool,
}

fn classify(name: &str) -> ElementFlags {
    match name {
        "script" | "style" | "textarea" | "title" => ElementFlags {
            raw_text: true,
            ..ElementFlags::default()
        },
        "area" | "base" | "basefont" | "bgsound" | "col" | "embed" | "frame" | "hr" | "img"
        | "input" | "isindex" | "keygen" | "link" | "meta" | "param" | "source" | "spacer"
        | "track" | "wbr" => ElementFlags {
            void: true,
            ..ElementFlags::default()
        },
        "br" => ElementFlags {
            void: true,
            implicit_close: true,
            ..ElementFlags::default()
        },
        "p" => ElementFlags {
            implicit_close: true,
            ..ElementFlags::default()
        },
        "form" => ElementFlags {
            overlap: true,
            ..ElementFlags::default()
        },
        _ => ElementFlags::default(),
    }
}

/// Flags for `name`, matched ASCII case-insensitively.
pub fn element_flags(name: &str) -> ElementFlags {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        classify(&name.to_ascii_lowercase())
    } else {
        classify(name)
    }
}

pub fn is_void_element(name: &str) -> bool {
    element_flags(name).void
}

pub fn is_raw_text_element(name: &str) -> bool {
    element_flags(name).raw_text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_are_flagged() {
        for name in ["img", "br", "hr", "input", "meta", "track"] {
            assert!(is_void_element(name), "expected {name} to be void");
        }
        assert!(!is_void_element("div"));
        assert!(!is_void_element("p"), "p can contain children");
    }

    #[test]
    fn raw_text_elements_are_flagged() {
        for name in ["script", "style", "textarea", "title"] {
            assert!(is_raw_text_element(name), "expected {name} to be raw text");
        }
        assert!(!is_raw_text_element("pre"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(is_void_element("IMG"));
        assert!(element_flags("ScRiPt").raw_text);
        assert!(element_flags("FORM").overlap);
    }

    #[test]
    fn p_and_br_close_implicitly() {
        assert!(element_flags("p").implicit_close);
        assert!(element_flags("br").implicit_close);
        assert!(!element_flags("div").implicit_close);
    }
}
