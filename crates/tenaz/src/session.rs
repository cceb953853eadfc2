//! Session - Abstract Automation Driver Trait
//!
//! The core never talks to a browser or device directly. Everything it needs
//! from the live document goes through [`Session`]: a query primitive that can
//! be scoped to a parent node, plus a handful of node reads. Any of them may
//! fail with [`crate::TenazError::StaleElement`] once a node has left the document;
//! that error is the staleness signal the finder recovers from.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Session (Abstract Trait)                                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌────────────┐  │
//! │  │  WebDriver       │  │  Appium          │  │  Mock      │  │
//! │  │  adapter         │  │  adapter         │  │  Session   │  │
//! │  └──────────────────┘  └──────────────────┘  └────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A session is a non-re-entrant resource: one logical automation session,
//! driven by one caller at a time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::TenazResult;
use crate::strategy::DriverQuery;

/// Opaque reference to a live node, as issued by the session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef(String);

impl NodeRef {
    /// Wrap a driver-issued element id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The driver-issued element id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Driver session the core issues queries against
pub trait Session {
    /// Short human-readable label, used as the root of element descriptions
    fn label(&self) -> String {
        "session".to_string()
    }

    /// Find nodes matching `query`, in document order.
    ///
    /// With `scope = None` the query runs from the document root; otherwise it
    /// runs relative to the given node (its children/descendants, or the
    /// axes an XPath expression names).
    fn find_nodes(&self, scope: Option<&NodeRef>, query: &DriverQuery)
        -> TenazResult<Vec<NodeRef>>;

    /// Read an attribute or property; `None` when the node has none
    fn attribute(&self, node: &NodeRef, name: &str) -> TenazResult<Option<String>>;

    /// Visible text of the node
    fn text(&self, node: &NodeRef) -> TenazResult<String>;

    /// Whether the node is rendered and visible
    fn is_displayed(&self, node: &NodeRef) -> TenazResult<bool>;

    /// Whether the node is selected (checkboxes, options)
    fn is_selected(&self, node: &NodeRef) -> TenazResult<bool>;

    /// Whether the node accepts interaction
    fn is_enabled(&self, node: &NodeRef) -> TenazResult<bool> {
        Ok(self.attribute(node, "disabled")?.is_none())
    }

    /// Driver debug description of how the node was found, if the driver
    /// keeps one (e.g. `[[driver] -> id: list] -> tag name: li]`)
    fn describe(&self, _node: &NodeRef) -> Option<String> {
        None
    }
}

/// Canonical disambiguation among several matches: the first visible node in
/// document order, else the first node overall.
pub fn prefer_visible<S: Session + ?Sized>(
    session: &S,
    nodes: &[NodeRef],
) -> TenazResult<Option<NodeRef>> {
    if nodes.len() < 2 {
        return Ok(nodes.first().cloned());
    }
    for node in nodes {
        if session.is_displayed(node)? {
            return Ok(Some(node.clone()));
        }
    }
    Ok(nodes.first().cloned())
}

/// Visibility where a node that has left the document counts as not displayed
pub(crate) fn displayed_or_gone<S: Session + ?Sized>(
    session: &S,
    node: &NodeRef,
) -> TenazResult<bool> {
    match session.is_displayed(node) {
        Err(err) if err.is_stale() => Ok(false),
        other => other,
    }
}
