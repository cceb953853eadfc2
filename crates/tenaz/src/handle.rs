//! Element handles and their ancestor chains.
//!
//! Every handle the finder returns remembers the chain of queries that
//! produced it, root first. That chain is what [`crate::PathReconstructor`]
//! replays when the underlying node goes stale.

use std::fmt;

use crate::session::NodeRef;
use crate::strategy::{DriverQuery, Strategy};

/// One hop of an ancestor chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    /// Query issued at this hop, relative to the previous hop's node
    pub query: DriverQuery,
    /// Index among the query's matches, when the hop came from a
    /// multi-element lookup. `None` means the visible-first pick.
    pub position: Option<usize>,
}

impl ChainStep {
    /// A hop resolved by the visible-first pick
    #[must_use]
    pub const fn new(query: DriverQuery) -> Self {
        Self {
            query,
            position: None,
        }
    }

    /// A hop pinned to the n-th match
    #[must_use]
    pub const fn at(query: DriverQuery, position: usize) -> Self {
        Self {
            query,
            position: Some(position),
        }
    }
}

/// Ordered queries from the session root down to an element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorChain {
    steps: Vec<ChainStep>,
}

impl AncestorChain {
    /// Empty chain
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Chain with explicit steps
    #[must_use]
    pub fn from_steps(steps: Vec<ChainStep>) -> Self {
        Self { steps }
    }

    /// Copy of this chain extended by one hop
    #[must_use]
    pub fn child(&self, step: ChainStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Append a hop in place
    pub fn push(&mut self, step: ChainStep) {
        self.steps.push(step);
    }

    /// Hops, root first
    #[must_use]
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Number of hops
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when nothing about the element's origin is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Driver-style nested description, e.g.
    /// `[[[session] -> id: list] -> tag name: li]`
    #[must_use]
    pub fn to_description(&self, root_label: &str) -> String {
        self.steps
            .iter()
            .fold(format!("[{root_label}]"), |inner, step| {
                format!("[{inner} -> {}]", step.query)
            })
    }

    /// Decode a driver debug description back into a chain.
    ///
    /// The description is split on ` -> `; the first segment names the
    /// session and is dropped. Each remaining segment is `strategy: value`
    /// wrapped in brackets. Trimming the wrapping brackets also eats closing
    /// brackets that belong to the selector (`//li[1]]`), so closing brackets
    /// are re-added until they balance the opening ones.
    ///
    /// Selectors containing ` -> ` cannot be decoded this way.
    pub fn from_description(description: &str) -> Result<Self, String> {
        let mut segments = description.split(" -> ");
        if segments.next().is_none() {
            return Err("empty description".to_string());
        }

        let mut steps = Vec::new();
        for segment in segments {
            let trimmed = segment
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']');
            let (strategy, value) = trimmed
                .split_once(": ")
                .ok_or_else(|| format!("malformed segment {segment:?}"))?;
            let strategy = Strategy::parse(strategy.trim()).map_err(|e| e.to_string())?;

            let mut value = value.to_string();
            let opening = value.matches('[').count();
            let closing = value.matches(']').count();
            for _ in closing..opening {
                value.push(']');
            }

            let query = crate::strategy::LocatorSpec::of(strategy, value)
                .to_query()
                .map_err(|e| e.to_string())?;
            steps.push(ChainStep::new(query));
        }

        if steps.is_empty() {
            return Err(format!("no locator steps in {description:?}"));
        }
        Ok(Self { steps })
    }
}

impl fmt::Display for AncestorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", step.query)?;
            if let Some(position) = step.position {
                write!(f, " [{position}]")?;
            }
        }
        Ok(())
    }
}

/// A reference to a live node plus the chain that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    node: NodeRef,
    chain: AncestorChain,
}

impl ElementHandle {
    /// Create a handle
    #[must_use]
    pub const fn new(node: NodeRef, chain: AncestorChain) -> Self {
        Self { node, chain }
    }

    /// Handle obtained outside the finder. Recovery falls back to the
    /// session's own description of the node.
    #[must_use]
    pub const fn detached(node: NodeRef) -> Self {
        Self {
            node,
            chain: AncestorChain::new(),
        }
    }

    /// Underlying node
    #[must_use]
    pub const fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Chain that produced the node
    #[must_use]
    pub const fn chain(&self) -> &AncestorChain {
        &self.chain
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chain.is_empty() {
            write!(f, "<{}>", self.node)
        } else {
            write!(f, "{} <{}>", self.chain, self.node)
        }
    }
}
