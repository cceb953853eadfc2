//! Mock Session
//!
//! An in-memory, scriptable [`Session`] for tests. It holds a small node tree
//! and lets a test make nodes go stale (detach, re-render, injected
//! staleness) or change over time (scheduled mutations applied the next time
//! the session is touched after their due time), without threads.
//!
//! Query support:
//!
//! | Query | Matches |
//! |---|---|
//! | id, name, class name, tag name | attributes / tag |
//! | mobile id | `resource-id` attribute |
//! | accessibility id | `content-desc` attribute |
//! | css | `#id`, `.class`, `tag`, or a registered alias |
//! | xpath | `..`, `parent::t`, `./t`, `.//t`, `following-sibling::t[1]`, `//t`, or a registered alias |
//! | uiautomator | registered alias |

use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::result::{TenazError, TenazResult};
use crate::session::{NodeRef, Session};
use crate::strategy::DriverQuery;

const REF_PREFIX: &str = "mock-";

/// Blueprint of a mock node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    hidden: bool,
    selected: bool,
    aliases: Vec<DriverQuery>,
}

impl MockNode {
    /// Visible node with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn with_id(self, id: &str) -> Self {
        self.with_attr("id", id)
    }

    /// Set the `name` attribute
    #[must_use]
    pub fn with_name(self, name: &str) -> Self {
        self.with_attr("name", name)
    }

    /// Add a class to the `class` attribute
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        let classes = self.attributes.entry("class".to_string()).or_default();
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
        self
    }

    /// Set any attribute
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        let _ = self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the visible text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Render the node hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Mark the node selected
    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Make the node match a selector the mock cannot evaluate itself
    #[must_use]
    pub fn matching(mut self, query: DriverQuery) -> Self {
        self.aliases.push(query);
        self
    }

    /// Tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn has_class(&self, class: &str) -> bool {
        self.attributes
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn has_tag(&self, tag: &str) -> bool {
        tag == "*" || self.tag == tag
    }

    fn attr_is(&self, name: &str, value: &str) -> bool {
        self.attributes.get(name).is_some_and(|v| v == value)
    }

    fn matches(&self, query: &DriverQuery) -> bool {
        if self.aliases.contains(query) {
            return true;
        }
        match query {
            DriverQuery::Id(v) => self.attr_is("id", v),
            DriverQuery::Name(v) => self.attr_is("name", v),
            DriverQuery::ClassName(v) => self.has_class(v),
            DriverQuery::TagName(v) => self.has_tag(v),
            DriverQuery::MobileId(v) => self.attr_is("resource-id", v),
            DriverQuery::AccessibilityId(v) => self.attr_is("content-desc", v),
            DriverQuery::Css(selector) => {
                if let Some(id) = selector.strip_prefix('#') {
                    is_word(id) && self.attr_is("id", id)
                } else if let Some(class) = selector.strip_prefix('.') {
                    is_word(class) && self.has_class(class)
                } else {
                    is_word(selector) && self.has_tag(selector)
                }
            }
            DriverQuery::XPath(expr) => expr
                .strip_prefix("//")
                .is_some_and(|tag| (is_word(tag) || tag == "*") && self.has_tag(tag)),
            DriverQuery::UiAutomator(_) => false,
        }
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Change applied to a mock document
#[derive(Debug, Clone)]
pub enum MockMutation {
    /// Set or remove an attribute
    SetAttribute {
        /// Target node
        node: NodeRef,
        /// Attribute name
        name: String,
        /// New value, `None` removes it
        value: Option<String>,
    },
    /// Replace the visible text
    SetText {
        /// Target node
        node: NodeRef,
        /// New text
        text: String,
    },
    /// Show or hide a node
    SetDisplayed {
        /// Target node
        node: NodeRef,
        /// Whether it is displayed
        displayed: bool,
    },
    /// Remove a node and its subtree from the document
    Detach {
        /// Target node
        node: NodeRef,
    },
    /// Replace a node by an identical one with a new reference
    Rerender {
        /// Target node
        node: NodeRef,
    },
    /// Append a node
    Append {
        /// Parent, or `None` for a new root
        parent: Option<NodeRef>,
        /// Node to append
        node: MockNode,
    },
}

#[derive(Debug)]
struct Slot {
    node: MockNode,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
    description: Option<String>,
}

#[derive(Debug, Default)]
struct Document {
    slots: Vec<Slot>,
    roots: Vec<usize>,
    pending: Vec<(Instant, MockMutation)>,
    injected: HashMap<usize, usize>,
    call_history: Vec<String>,
}

enum Axis<'q> {
    Parent,
    ParentTag(&'q str),
    Child(&'q str),
    Descendant(&'q str),
    FollowingSibling { tag: &'q str, nearest: bool },
    PrecedingSibling { tag: &'q str, nearest: bool },
}

impl<'q> Axis<'q> {
    fn parse(expr: &'q str) -> Option<Self> {
        if expr == ".." {
            return Some(Self::Parent);
        }
        if let Some(tag) = expr.strip_prefix("parent::") {
            return Some(Self::ParentTag(tag));
        }
        if let Some(tag) = expr.strip_prefix(".//") {
            return Some(Self::Descendant(tag));
        }
        if let Some(tag) = expr.strip_prefix("./") {
            return Some(Self::Child(tag));
        }
        if let Some(rest) = expr.strip_prefix("following-sibling::") {
            let (tag, nearest) = Self::nearest(rest);
            return Some(Self::FollowingSibling { tag, nearest });
        }
        expr.strip_prefix("preceding-sibling::").map(|rest| {
            let (tag, nearest) = Self::nearest(rest);
            Self::PrecedingSibling { tag, nearest }
        })
    }

    fn nearest(rest: &'q str) -> (&'q str, bool) {
        rest.strip_suffix("[1]").map_or((rest, false), |tag| (tag, true))
    }
}

fn node_ref(index: usize) -> NodeRef {
    NodeRef::new(format!("{REF_PREFIX}{index}"))
}

fn slot_index(node: &NodeRef) -> Option<usize> {
    node.id().strip_prefix(REF_PREFIX)?.parse().ok()
}

impl Document {
    fn apply_due(&mut self, now: Instant) {
        if self.pending.is_empty() {
            return;
        }
        let (mut due, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|(at, _)| *at <= now);
        self.pending = later;
        due.sort_by_key(|(at, _)| *at);
        for (_, mutation) in due {
            let _ = self.apply(mutation);
        }
    }

    fn apply(&mut self, mutation: MockMutation) -> Option<NodeRef> {
        match mutation {
            MockMutation::SetAttribute { node, name, value } => {
                let slot = self.slot_mut(&node)?;
                match value {
                    Some(value) => {
                        let _ = slot.node.attributes.insert(name, value);
                    }
                    None => {
                        let _ = slot.node.attributes.remove(&name);
                    }
                }
                None
            }
            MockMutation::SetText { node, text } => {
                self.slot_mut(&node)?.node.text = text;
                None
            }
            MockMutation::SetDisplayed { node, displayed } => {
                self.slot_mut(&node)?.node.hidden = !displayed;
                None
            }
            MockMutation::Detach { node } => {
                let index = slot_index(&node).filter(|i| *i < self.slots.len())?;
                self.unlink(index);
                self.mark_detached(index);
                None
            }
            MockMutation::Rerender { node } => {
                let index = slot_index(&node).filter(|i| *i < self.slots.len())?;
                Some(self.rerender(index))
            }
            MockMutation::Append { parent, node } => {
                let parent = parent.as_ref().and_then(slot_index);
                Some(self.insert(parent, node))
            }
        }
    }

    fn slot_mut(&mut self, node: &NodeRef) -> Option<&mut Slot> {
        slot_index(node).and_then(|i| self.slots.get_mut(i))
    }

    fn insert(&mut self, parent: Option<usize>, node: MockNode) -> NodeRef {
        let index = self.slots.len();
        let parent = parent.filter(|p| self.slots.get(*p).is_some_and(|s| s.attached));
        self.slots.push(Slot {
            node,
            parent,
            children: Vec::new(),
            attached: true,
            description: None,
        });
        match parent {
            Some(p) => self.slots[p].children.push(index),
            None => self.roots.push(index),
        }
        node_ref(index)
    }

    fn unlink(&mut self, index: usize) {
        let siblings = match self.slots[index].parent {
            Some(p) => &mut self.slots[p].children,
            None => &mut self.roots,
        };
        siblings.retain(|&i| i != index);
    }

    fn mark_detached(&mut self, index: usize) {
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            self.slots[i].attached = false;
            stack.extend(self.slots[i].children.iter().copied());
        }
    }

    fn rerender(&mut self, index: usize) -> NodeRef {
        if !self.slots[index].attached {
            return node_ref(index);
        }
        let fresh = self.slots.len();
        let parent = self.slots[index].parent;
        let children = std::mem::take(&mut self.slots[index].children);
        for &child in &children {
            self.slots[child].parent = Some(fresh);
        }
        let node = self.slots[index].node.clone();
        self.slots.push(Slot {
            node,
            parent,
            children,
            attached: true,
            description: None,
        });
        self.slots[index].attached = false;

        let siblings = match parent {
            Some(p) => &mut self.slots[p].children,
            None => &mut self.roots,
        };
        if let Some(position) = siblings.iter().position(|&i| i == index) {
            siblings[position] = fresh;
        }
        node_ref(fresh)
    }

    fn live(&mut self, node: &NodeRef) -> TenazResult<usize> {
        let index = slot_index(node)
            .filter(|i| *i < self.slots.len())
            .ok_or_else(|| TenazError::stale(format!("unknown node {node}")))?;
        if let Some(remaining) = self.injected.get_mut(&index) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TenazError::stale(format!("{node} (injected)")));
            }
        }
        if !self.slots[index].attached {
            return Err(TenazError::stale(format!("{node} is no longer attached")));
        }
        Ok(index)
    }

    fn preorder(&self, from: &[usize], out: &mut Vec<usize>) {
        for &index in from {
            out.push(index);
            self.preorder(&self.slots[index].children, out);
        }
    }

    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.preorder(&self.slots[index].children, &mut out);
        out
    }

    fn displayed(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if self.slots[i].node.hidden {
                return false;
            }
            current = self.slots[i].parent;
        }
        true
    }

    fn query(&self, scope: Option<usize>, query: &DriverQuery) -> Vec<usize> {
        if let (Some(scope), DriverQuery::XPath(expr)) = (scope, query) {
            if let Some(axis) = Axis::parse(expr) {
                return self.axis(scope, &axis);
            }
        }
        let candidates = match scope {
            Some(scope) => self.descendants(scope),
            None => {
                let mut all = Vec::new();
                self.preorder(&self.roots, &mut all);
                all
            }
        };
        candidates
            .into_iter()
            .filter(|&i| self.slots[i].node.matches(query))
            .collect()
    }

    fn axis(&self, scope: usize, axis: &Axis<'_>) -> Vec<usize> {
        let slot = &self.slots[scope];
        match axis {
            Axis::Parent => slot.parent.into_iter().collect(),
            Axis::ParentTag(tag) => slot
                .parent
                .filter(|&p| self.slots[p].node.has_tag(tag))
                .into_iter()
                .collect(),
            Axis::Child(tag) => slot
                .children
                .iter()
                .copied()
                .filter(|&c| self.slots[c].node.has_tag(tag))
                .collect(),
            Axis::Descendant(tag) => self
                .descendants(scope)
                .into_iter()
                .filter(|&d| self.slots[d].node.has_tag(tag))
                .collect(),
            Axis::FollowingSibling { tag, nearest } => {
                let following = self
                    .siblings(scope)
                    .iter()
                    .skip_while(|&&i| i != scope)
                    .skip(1)
                    .copied()
                    .filter(|&i| self.slots[i].node.has_tag(tag));
                if *nearest {
                    following.take(1).collect()
                } else {
                    following.collect()
                }
            }
            Axis::PrecedingSibling { tag, nearest } => {
                let preceding: Vec<usize> = self
                    .siblings(scope)
                    .iter()
                    .take_while(|&&i| i != scope)
                    .copied()
                    .filter(|&i| self.slots[i].node.has_tag(tag))
                    .collect();
                if *nearest {
                    preceding.last().copied().into_iter().collect()
                } else {
                    preceding
                }
            }
        }
    }

    fn siblings(&self, scope: usize) -> &[usize] {
        match self.slots[scope].parent {
            Some(p) => &self.slots[p].children,
            None => &self.roots,
        }
    }
}

/// Scriptable in-memory session
#[derive(Debug)]
pub struct MockSession {
    id: Uuid,
    document: RefCell<Document>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            document: RefCell::new(Document::default()),
        }
    }

    /// Session id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    fn document(&self) -> RefMut<'_, Document> {
        let mut document = self.document.borrow_mut();
        document.apply_due(Instant::now());
        document
    }

    /// Add a node under `parent`, or as a new root
    pub fn add(&self, parent: Option<&NodeRef>, node: MockNode) -> NodeRef {
        let mut document = self.document();
        let parent = parent.and_then(slot_index);
        document.insert(parent, node)
    }

    /// Apply a mutation now. Returns the new reference for `Rerender` and
    /// `Append`.
    pub fn apply(&self, mutation: MockMutation) -> Option<NodeRef> {
        self.document().apply(mutation)
    }

    /// Apply a mutation once `after` has elapsed
    pub fn schedule(&self, after: Duration, mutation: MockMutation) {
        let at = Instant::now() + after;
        self.document.borrow_mut().pending.push((at, mutation));
    }

    /// Remove a node and its subtree; every reference into it goes stale
    pub fn detach(&self, node: &NodeRef) {
        let _ = self.apply(MockMutation::Detach { node: node.clone() });
    }

    /// Replace a node by an identical one. The old reference goes stale;
    /// children keep theirs.
    pub fn rerender(&self, node: &NodeRef) -> NodeRef {
        self.apply(MockMutation::Rerender { node: node.clone() })
            .unwrap_or_else(|| node.clone())
    }

    /// Set (`Some`) or remove (`None`) an attribute
    pub fn set_attribute(&self, node: &NodeRef, name: &str, value: Option<&str>) {
        let _ = self.apply(MockMutation::SetAttribute {
            node: node.clone(),
            name: name.to_string(),
            value: value.map(str::to_string),
        });
    }

    /// Replace the visible text
    pub fn set_text(&self, node: &NodeRef, text: &str) {
        let _ = self.apply(MockMutation::SetText {
            node: node.clone(),
            text: text.to_string(),
        });
    }

    /// Show or hide a node
    pub fn set_displayed(&self, node: &NodeRef, displayed: bool) {
        let _ = self.apply(MockMutation::SetDisplayed {
            node: node.clone(),
            displayed,
        });
    }

    /// Override the debug description reported for a node
    pub fn set_description(&self, node: &NodeRef, description: &str) {
        if let Some(slot) = self.document().slot_mut(node) {
            slot.description = Some(description.to_string());
        }
    }

    /// Make the next `times` accesses to `node` report staleness
    pub fn inject_stale(&self, node: &NodeRef, times: usize) {
        if let Some(index) = slot_index(node) {
            let _ = self.document().injected.insert(index, times);
        }
    }

    /// Schedule an attribute change
    pub fn schedule_attribute(&self, after: Duration, node: &NodeRef, name: &str, value: Option<&str>) {
        self.schedule(
            after,
            MockMutation::SetAttribute {
                node: node.clone(),
                name: name.to_string(),
                value: value.map(str::to_string),
            },
        );
    }

    /// Schedule a text change
    pub fn schedule_text(&self, after: Duration, node: &NodeRef, text: &str) {
        self.schedule(
            after,
            MockMutation::SetText {
                node: node.clone(),
                text: text.to_string(),
            },
        );
    }

    /// Schedule a visibility change
    pub fn schedule_displayed(&self, after: Duration, node: &NodeRef, displayed: bool) {
        self.schedule(
            after,
            MockMutation::SetDisplayed {
                node: node.clone(),
                displayed,
            },
        );
    }

    /// Schedule a detach
    pub fn schedule_detach(&self, after: Duration, node: &NodeRef) {
        self.schedule(after, MockMutation::Detach { node: node.clone() });
    }

    /// Schedule a re-render
    pub fn schedule_rerender(&self, after: Duration, node: &NodeRef) {
        self.schedule(after, MockMutation::Rerender { node: node.clone() });
    }

    /// Schedule a node to appear
    pub fn schedule_add(&self, after: Duration, parent: Option<&NodeRef>, node: MockNode) {
        self.schedule(
            after,
            MockMutation::Append {
                parent: parent.cloned(),
                node,
            },
        );
    }

    /// Number of nodes currently in the document
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.document().slots.iter().filter(|s| s.attached).count()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.document.borrow().call_history.clone()
    }

    /// Check if a method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.document
            .borrow()
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Number of recorded calls containing `fragment`
    #[must_use]
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.document
            .borrow()
            .call_history
            .iter()
            .filter(|c| c.contains(fragment))
            .count()
    }

    /// Forget recorded calls
    pub fn clear_history(&self) {
        self.document.borrow_mut().call_history.clear();
    }
}

impl Session for MockSession {
    fn label(&self) -> String {
        format!("MockSession ({})", self.id)
    }

    fn find_nodes(&self, scope: Option<&NodeRef>, query: &DriverQuery) -> TenazResult<Vec<NodeRef>> {
        let mut document = self.document();
        document.call_history.push(match scope {
            Some(scope) => format!("find_nodes:{query} in {scope}"),
            None => format!("find_nodes:{query}"),
        });

        let scope_index = scope.map(|s| document.live(s)).transpose()?;
        let matches = document.query(scope_index, query);

        let parent_description = match scope_index {
            Some(i) => document.slots[i].description.clone(),
            None => Some(format!("[{}]", self.label())),
        };
        if let Some(parent_description) = parent_description {
            let description = format!("[{parent_description} -> {query}]");
            for &i in &matches {
                document.slots[i].description = Some(description.clone());
            }
        }

        Ok(matches.into_iter().map(node_ref).collect())
    }

    fn attribute(&self, node: &NodeRef, name: &str) -> TenazResult<Option<String>> {
        let mut document = self.document();
        document.call_history.push(format!("attribute:{node}:{name}"));
        let index = document.live(node)?;
        Ok(document.slots[index].node.attributes.get(name).cloned())
    }

    fn text(&self, node: &NodeRef) -> TenazResult<String> {
        let mut document = self.document();
        document.call_history.push(format!("text:{node}"));
        let index = document.live(node)?;
        if document.displayed(index) {
            Ok(document.slots[index].node.text.clone())
        } else {
            Ok(String::new())
        }
    }

    fn is_displayed(&self, node: &NodeRef) -> TenazResult<bool> {
        let mut document = self.document();
        document.call_history.push(format!("is_displayed:{node}"));
        let index = document.live(node)?;
        Ok(document.displayed(index))
    }

    fn is_selected(&self, node: &NodeRef) -> TenazResult<bool> {
        let mut document = self.document();
        document.call_history.push(format!("is_selected:{node}"));
        let index = document.live(node)?;
        Ok(document.slots[index].node.selected)
    }

    fn describe(&self, node: &NodeRef) -> Option<String> {
        let document = self.document.borrow();
        slot_index(node)
            .and_then(|i| document.slots.get(i))
            .and_then(|slot| slot.description.clone())
    }
}
