//! Error taxonomy.
//!
//! Only structural-limit violations and API misuse are errors. Tolerated
//! parse anomalies (unmatched end tags, missing quotes, bare attributes)
//! never surface here; the tree builder recovers and continues.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlError {
    /// Nesting exceeded the configured maximum depth. Fatal for the current
    /// parse or mutation; continuing would risk unbounded stack/memory use.
    TooDeep {
        depth: usize,
        line: u32,
        column: u32,
    },
    /// The reference/old child passed to a mutation is not a child of the
    /// target parent.
    NotAChild,
    /// Attaching the node would make it its own ancestor.
    WouldCreateCycle,
    /// The operation requires an element node.
    NotAnElement,
    /// Strict class add: the class token is already present.
    DuplicateClass(String),
    /// Strict class remove/replace: the class token is not present.
    ClassNotFound(String),
    /// `element_by_id` called while the identifier index is disabled.
    IdIndexDisabled,
}

impl fmt::Display for HtmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlError::TooDeep {
                depth,
                line,
                column,
            } => write!(
                f,
                "document is too deeply nested to process (depth {depth} at {line}:{column})"
            ),
            HtmlError::NotAChild => write!(f, "reference node is not a child of this node"),
            HtmlError::WouldCreateCycle => {
                write!(f, "node cannot be attached inside its own subtree")
            }
            HtmlError::NotAnElement => write!(f, "operation requires an element node"),
            HtmlError::DuplicateClass(name) => write!(f, "class '{name}' is already present"),
            HtmlError::ClassNotFound(name) => write!(f, "class '{name}' is not present"),
            HtmlError::IdIndexDisabled => {
                write!(f, "identifier index is disabled by configuration")
            }
        }
    }
}

impl std::error::Error for HtmlError {}
