//! Attribute condition waits.
//!
//! Polls one attribute of one element until it relates to an expected value.
//! Values are compared as opaque strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::SyncConfig;
use crate::handle::ElementHandle;
use crate::reconstruct::{PathReconstructor, RebuildOptions};
use crate::result::TenazResult;
use crate::session::Session;
use crate::wait::{WaitResult, Waiter};

/// How the current attribute value must relate to the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// current == expected
    Equals,
    /// current != expected
    NotEquals,
    /// current contains expected
    Contains,
    /// current does not contain expected
    NotContains,
}

impl Relation {
    /// Evaluate the relation. An absent attribute equals and contains nothing.
    #[must_use]
    pub fn holds(self, current: Option<&str>, expected: &str) -> bool {
        match (self, current) {
            (Self::Equals, Some(current)) => current == expected,
            (Self::NotEquals, Some(current)) => current != expected,
            (Self::Contains, Some(current)) => current.contains(expected),
            (Self::NotContains, Some(current)) => !current.contains(expected),
            (Self::Equals | Self::Contains, None) => false,
            (Self::NotEquals | Self::NotContains, None) => true,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
        })
    }
}

/// Attribute condition, plus how to re-find the element if it goes stale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCondition {
    /// Attribute to read
    pub attribute: String,
    /// Value to compare against
    pub expected: String,
    /// Comparison
    pub relation: Relation,
    /// Position in the sibling list when rebuilding
    #[serde(default)]
    pub index: Option<usize>,
    /// Read the attribute of the rebuilt element's parent
    #[serde(default)]
    pub use_parent: bool,
}

impl AttributeCondition {
    /// Condition with default rebuild behaviour
    #[must_use]
    pub fn new(attribute: impl Into<String>, expected: impl Into<String>, relation: Relation) -> Self {
        Self {
            attribute: attribute.into(),
            expected: expected.into(),
            relation,
            index: None,
            use_parent: false,
        }
    }

    /// Rebuild as the n-th match of the element's list
    #[must_use]
    pub const fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Rebuild as the parent of the matched element
    #[must_use]
    pub const fn from_parent(mut self) -> Self {
        self.use_parent = true;
        self
    }

    /// Whether `current` satisfies the condition
    #[must_use]
    pub fn evaluate(&self, current: Option<&str>) -> bool {
        self.relation.holds(current, &self.expected)
    }

    /// Rebuild options for the first staleness
    #[must_use]
    pub const fn rebuild_options(&self) -> RebuildOptions {
        RebuildOptions {
            index: self.index,
            use_parent: self.use_parent,
        }
    }
}

impl fmt::Display for AttributeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.attribute, self.relation, self.expected)
    }
}

/// Polls attribute conditions on one session
#[derive(Debug)]
pub struct AttributeWait<'a, S: Session + ?Sized> {
    session: &'a S,
    waiter: Waiter,
}

impl<'a, S: Session + ?Sized> AttributeWait<'a, S> {
    /// Create attribute waits over a session
    #[must_use]
    pub const fn new(session: &'a S, config: &'a SyncConfig) -> Self {
        Self {
            session,
            waiter: Waiter::from_config(config),
        }
    }

    /// Block until `condition` holds on `handle`. Timing out always fails.
    ///
    /// When the element goes stale it is rebuilt, the first time with the
    /// condition's index/parent selection, and polling continues on the
    /// rebuilt element. A failed rebuild aborts the wait.
    pub fn await_condition(
        &self,
        handle: &ElementHandle,
        condition: &AttributeCondition,
        timeout: Duration,
    ) -> TenazResult<WaitResult> {
        let reconstructor = PathReconstructor::new(self.session);
        let description = format!("{condition} on {handle}");
        let mut target = handle.clone();
        let mut options = condition.rebuild_options();

        self.waiter.poll_fn(&description, timeout, true, || {
            let current = match self.session.attribute(target.node(), &condition.attribute) {
                Err(stale) if stale.is_stale() => {
                    target = reconstructor.recover(&target, options, &stale)?;
                    options = RebuildOptions::default();
                    self.session.attribute(target.node(), &condition.attribute)?
                }
                other => other?,
            };
            debug!(
                element = %target,
                attribute = %condition.attribute,
                current = ?current,
                expected = %condition.expected,
                relation = %condition.relation,
                "polled attribute"
            );
            Ok(condition.evaluate(current.as_deref()))
        })
    }

    /// Shorthand for a condition without rebuild selection
    pub fn await_attribute(
        &self,
        handle: &ElementHandle,
        attribute: &str,
        expected: &str,
        relation: Relation,
        timeout: Duration,
    ) -> TenazResult<WaitResult> {
        self.await_condition(handle, &AttributeCondition::new(attribute, expected, relation), timeout)
    }
}
