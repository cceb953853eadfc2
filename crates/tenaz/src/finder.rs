//! Element Finder
//!
//! Executes driver queries against a [`Session`] and turns the matches into
//! [`ElementHandle`]s that remember how they were found.
//!
//! ## Lookup semantics
//!
//! - [`ElementFinder::find_one`] runs a best-effort presence probe, queries,
//!   and picks the first visible candidate in document order, else the first
//!   candidate overall.
//! - [`ElementFinder::find_all`] waits (bounded) for at least one candidate,
//!   queries, and applies an optional filter. Results stay in document order.
//!
//! ## Staleness
//!
//! Any operation scoped to an existing handle recovers from a stale reference
//! exactly once: the handle is rebuilt through [`PathReconstructor`] and the
//! operation is retried on the fresh handle. If the rebuild fails, or the
//! retry goes stale again, the caller gets
//! [`TenazError::ReconstructionFailed`].

use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::config::SyncConfig;
use crate::handle::{AncestorChain, ChainStep, ElementHandle};
use crate::reconstruct::{PathReconstructor, RebuildOptions};
use crate::result::{TenazError, TenazResult};
use crate::session::{prefer_visible, NodeRef, Session};
use crate::strategy::DriverQuery;
use crate::wait::Waiter;

/// Predicate applied to each candidate of a multi-element lookup
pub type ElementFilter<'f, S> = &'f dyn Fn(&S, &ElementHandle) -> bool;

/// Finds elements and recovers them when they go stale
#[derive(Debug)]
pub struct ElementFinder<'a, S: Session + ?Sized> {
    session: &'a S,
    config: &'a SyncConfig,
}

impl<'a, S: Session + ?Sized> ElementFinder<'a, S> {
    /// Create a finder over a session
    #[must_use]
    pub const fn new(session: &'a S, config: &'a SyncConfig) -> Self {
        Self { session, config }
    }

    /// Session the finder queries
    #[must_use]
    pub const fn session(&self) -> &'a S {
        self.session
    }

    /// Reconstructor over the same session
    #[must_use]
    pub const fn reconstructor(&self) -> PathReconstructor<'a, S> {
        PathReconstructor::new(self.session)
    }

    // =========================================================================
    // Single-element lookups
    // =========================================================================

    /// Find one element from the session root.
    ///
    /// Returns `Ok(None)` when nothing matches and `throw_on_missing` is
    /// false; fails with [`TenazError::ElementNotFound`] otherwise.
    pub fn find_one(
        &self,
        query: &DriverQuery,
        throw_on_missing: bool,
    ) -> TenazResult<Option<ElementHandle>> {
        debug!(query = %query, "find one");
        self.probe_presence(None, query);

        let found = match self.select_one(None, &AncestorChain::new(), query) {
            Err(stale) if stale.is_stale() => {
                warn!(query = %query, "candidate went stale during selection, querying again");
                self.select_one(None, &AncestorChain::new(), query)
                    .map_err(|again| {
                        if again.is_stale() {
                            TenazError::ReconstructionFailed {
                                element: query.to_string(),
                                reason: format!("query still returned stale references: {again}"),
                                stale: stale.to_string(),
                            }
                        } else {
                            again
                        }
                    })?
            }
            other => other?,
        };

        self.report_single(found, query, throw_on_missing)
    }

    /// Find one element under `parent`, recovering `parent` if it went stale
    pub fn find_one_in(
        &self,
        parent: &ElementHandle,
        query: &DriverQuery,
        throw_on_missing: bool,
    ) -> TenazResult<Option<ElementHandle>> {
        debug!(parent = %parent, query = %query, "find one in scope");
        let found = self.with_recovery(parent, RebuildOptions::default(), |scope| {
            self.probe_presence(Some(scope.node()), query);
            self.select_one(Some(scope.node()), scope.chain(), query)
        })?;
        self.report_single(found, query, throw_on_missing)
    }

    /// First match of `query`, in document order, that passes `filter`.
    /// Absence is reported as in [`Self::find_one`].
    pub fn find_one_where(
        &self,
        query: &DriverQuery,
        filter: ElementFilter<'_, S>,
        throw_on_missing: bool,
    ) -> TenazResult<Option<ElementHandle>> {
        debug!(query = %query, "find one with filter");
        self.probe_presence(None, query);
        let chain = AncestorChain::new();
        let found = self
            .session
            .find_nodes(None, query)?
            .into_iter()
            .enumerate()
            .map(|(i, node)| ElementHandle::new(node, chain.child(ChainStep::at(query.clone(), i))))
            .find(|handle| filter(self.session, handle));
        self.report_single(found, query, throw_on_missing)
    }

    fn select_one(
        &self,
        scope: Option<&NodeRef>,
        chain: &AncestorChain,
        query: &DriverQuery,
    ) -> TenazResult<Option<ElementHandle>> {
        let nodes = self.session.find_nodes(scope, query)?;
        if nodes.len() > 1 {
            debug!(query = %query, candidates = nodes.len(), "several candidates, preferring visible");
        }
        Ok(prefer_visible(self.session, &nodes)?
            .map(|node| ElementHandle::new(node, chain.child(ChainStep::new(query.clone())))))
    }

    fn report_single(
        &self,
        found: Option<ElementHandle>,
        query: &DriverQuery,
        throw_on_missing: bool,
    ) -> TenazResult<Option<ElementHandle>> {
        match found {
            Some(handle) => Ok(Some(handle)),
            None if throw_on_missing => {
                error!(query = %query, "unable to locate element");
                Err(TenazError::ElementNotFound {
                    query: query.to_string(),
                })
            }
            None => {
                warn!(query = %query, "no element found");
                Ok(None)
            }
        }
    }

    /// Short wait for the query to match something. Failures are ignored:
    /// the query that follows is the source of truth.
    fn probe_presence(&self, scope: Option<&NodeRef>, query: &DriverQuery) {
        let budget = self.config.presence_probe();
        if budget.is_zero() {
            return;
        }
        let waiter = Waiter::from_config(self.config);
        let description = format!("presence of {query}");
        if let Err(err) = waiter.poll_fn(&description, budget, false, || {
            self.any_present(scope, query)
        }) {
            debug!(query = %query, error = %err, "presence probe failed");
        }
    }

    /// True when the query matches. A stale scope also ends the wait so the
    /// lookup that follows can report it.
    fn any_present(&self, scope: Option<&NodeRef>, query: &DriverQuery) -> TenazResult<bool> {
        match self.session.find_nodes(scope, query) {
            Ok(nodes) => Ok(!nodes.is_empty()),
            Err(err) if err.is_stale() => Ok(true),
            Err(err) => Err(err),
        }
    }

    // =========================================================================
    // Multi-element lookups
    // =========================================================================

    /// Find every element matching `query` from the session root.
    ///
    /// Waits up to `timeout` (zero means the configured find-all timeout) for
    /// at least one match before querying.
    pub fn find_all(
        &self,
        query: &DriverQuery,
        filter: Option<ElementFilter<'_, S>>,
        throw_on_missing: bool,
        timeout: Duration,
    ) -> TenazResult<Vec<ElementHandle>> {
        debug!(query = %query, "find all");
        self.collect(None, &AncestorChain::new(), query, filter, throw_on_missing, timeout)
    }

    /// Find every element matching `query` under `parent`
    pub fn find_all_in(
        &self,
        parent: &ElementHandle,
        query: &DriverQuery,
        filter: Option<ElementFilter<'_, S>>,
        throw_on_missing: bool,
        timeout: Duration,
    ) -> TenazResult<Vec<ElementHandle>> {
        debug!(parent = %parent, query = %query, "find all in scope");
        self.with_recovery(parent, RebuildOptions::default(), |scope| {
            self.collect(
                Some(scope.node()),
                scope.chain(),
                query,
                filter,
                throw_on_missing,
                timeout,
            )
        })
    }

    fn collect(
        &self,
        scope: Option<&NodeRef>,
        chain: &AncestorChain,
        query: &DriverQuery,
        filter: Option<ElementFilter<'_, S>>,
        throw_on_missing: bool,
        timeout: Duration,
    ) -> TenazResult<Vec<ElementHandle>> {
        let timeout = if timeout.is_zero() {
            self.config.find_all_timeout()
        } else {
            timeout
        };
        let start = Instant::now();
        let description = format!("at least one match for {query}");
        Waiter::from_config(self.config).poll_fn(&description, timeout, false, || {
            self.any_present(scope, query)
        })?;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let nodes = self.session.find_nodes(scope, query)?;
        let total = nodes.len();
        let handles: Vec<ElementHandle> = nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| ElementHandle::new(node, chain.child(ChainStep::at(query.clone(), i))))
            .filter(|handle| filter.map_or(true, |keep| keep(self.session, handle)))
            .collect();
        debug!(query = %query, total, kept = handles.len(), elapsed_ms, "find all matched");

        if handles.is_empty() {
            if throw_on_missing {
                error!(query = %query, elapsed_ms, "no elements found");
                return Err(TenazError::NoMatches {
                    query: query.to_string(),
                    elapsed_ms,
                });
            }
            warn!(query = %query, elapsed_ms, "no elements found");
        }
        Ok(handles)
    }

    // =========================================================================
    // Relatives and descendants
    // =========================================================================

    /// Descendants of `parent` with the given tag. `immediate` restricts the
    /// search to direct children.
    pub fn find_descendants(
        &self,
        parent: &ElementHandle,
        descendant: &str,
        immediate: bool,
        throw_on_missing: bool,
    ) -> TenazResult<Vec<ElementHandle>> {
        let axis = if immediate { "./" } else { ".//" };
        let query = DriverQuery::xpath(format!("{axis}{descendant}"));
        self.find_all_in(parent, &query, None, throw_on_missing, Duration::ZERO)
    }

    /// Elements matching `query` that contain a match for `descendant`
    pub fn find_all_with_descendant(
        &self,
        query: &DriverQuery,
        descendant: &DriverQuery,
    ) -> TenazResult<Vec<ElementHandle>> {
        self.partition_by_descendant(query, descendant, true)
    }

    /// Elements matching `query` that contain no match for `descendant`
    pub fn find_all_without_descendant(
        &self,
        query: &DriverQuery,
        descendant: &DriverQuery,
    ) -> TenazResult<Vec<ElementHandle>> {
        self.partition_by_descendant(query, descendant, false)
    }

    fn partition_by_descendant(
        &self,
        query: &DriverQuery,
        descendant: &DriverQuery,
        wanted: bool,
    ) -> TenazResult<Vec<ElementHandle>> {
        let candidates = self.find_all(query, None, false, Duration::ZERO)?;
        let mut kept = Vec::with_capacity(candidates.len());
        for handle in candidates {
            let has = self.with_recovery(&handle, RebuildOptions::default(), |scope| {
                Ok(!self.session.find_nodes(Some(scope.node()), descendant)?.is_empty())
            })?;
            if has == wanted {
                kept.push(handle);
            }
        }
        Ok(kept)
    }

    /// Nearest parent of `handle`, which must carry the given tag (`*` for any)
    pub fn find_parent(&self, handle: &ElementHandle, tag: &str) -> TenazResult<ElementHandle> {
        let query = DriverQuery::xpath(format!("parent::{tag}"));
        self.find_one_in(handle, &query, true)?
            .ok_or_else(|| TenazError::ElementNotFound {
                query: query.to_string(),
            })
    }

    /// Following siblings of `handle` with the given tag. `immediate` keeps
    /// only the nearest one.
    pub fn find_following_siblings(
        &self,
        handle: &ElementHandle,
        tag: &str,
        immediate: bool,
    ) -> TenazResult<Vec<ElementHandle>> {
        let expr = if immediate {
            format!("following-sibling::{tag}[1]")
        } else {
            format!("following-sibling::{tag}")
        };
        self.find_all_in(handle, &DriverQuery::xpath(expr), None, false, Duration::ZERO)
    }

    /// Preceding siblings of `handle` with the given tag, in document order.
    /// `immediate` keeps only the nearest one.
    pub fn find_preceding_siblings(
        &self,
        handle: &ElementHandle,
        tag: &str,
        immediate: bool,
    ) -> TenazResult<Vec<ElementHandle>> {
        let expr = if immediate {
            format!("preceding-sibling::{tag}[1]")
        } else {
            format!("preceding-sibling::{tag}")
        };
        self.find_all_in(handle, &DriverQuery::xpath(expr), None, false, Duration::ZERO)
    }

    /// Nearest ancestor of `handle` whose `attribute` contains `value`.
    ///
    /// The walk ends at the document root, where `Ok(None)` is returned.
    pub fn find_parent_with_attribute(
        &self,
        handle: &ElementHandle,
        attribute: &str,
        value: &str,
    ) -> TenazResult<Option<ElementHandle>> {
        let step = DriverQuery::xpath("parent::*");
        self.with_recovery(handle, RebuildOptions::default(), |start| {
            let mut current = start.clone();
            let mut depth = 0_usize;
            while let Some(parent) = self
                .session
                .find_nodes(Some(current.node()), &step)?
                .into_iter()
                .next()
            {
                depth += 1;
                let chain = current.chain().child(ChainStep::new(step.clone()));
                let ancestor = ElementHandle::new(parent, chain);
                let held = self.session.attribute(ancestor.node(), attribute)?;
                if held.is_some_and(|held| held.contains(value)) {
                    debug!(element = %handle, attribute, depth, "ancestor with attribute found");
                    return Ok(Some(ancestor));
                }
                current = ancestor;
            }
            debug!(element = %handle, attribute, value, depth, "reached the root without a match");
            Ok(None)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Raw query result, no selection and no waiting
    pub fn nodes(&self, scope: Option<&NodeRef>, query: &DriverQuery) -> TenazResult<Vec<NodeRef>> {
        self.session.find_nodes(scope, query)
    }

    /// Text of an element: visible text, else `textContent`, else `value`,
    /// else empty
    pub fn text_of(&self, handle: &ElementHandle) -> TenazResult<String> {
        self.with_recovery(handle, RebuildOptions::default(), |fresh| {
            let node = fresh.node();
            let text = self.session.text(node)?;
            if !text.is_empty() {
                return Ok(text);
            }
            for fallback in ["textContent", "value"] {
                if let Some(value) = self.session.attribute(node, fallback)? {
                    if !value.is_empty() {
                        return Ok(value);
                    }
                }
            }
            Ok(String::new())
        })
    }

    /// Attribute of an element.
    ///
    /// An absent attribute fails with [`TenazError::AttributeMissing`] when
    /// `throw_on_missing` is set, else yields `None`.
    pub fn attribute_of(
        &self,
        handle: &ElementHandle,
        name: &str,
        throw_on_missing: bool,
    ) -> TenazResult<Option<String>> {
        let value = self.with_recovery(handle, RebuildOptions::default(), |fresh| {
            self.session.attribute(fresh.node(), name)
        })?;
        if value.is_none() {
            if throw_on_missing {
                error!(element = %handle, attribute = name, "attribute missing");
                return Err(TenazError::AttributeMissing {
                    element: handle.to_string(),
                    attribute: name.to_string(),
                });
            }
            debug!(element = %handle, attribute = name, "attribute missing");
        }
        Ok(value)
    }

    /// Whether the element is displayed, recovering it if stale
    pub fn is_displayed(&self, handle: &ElementHandle) -> TenazResult<bool> {
        self.with_recovery(handle, RebuildOptions::default(), |fresh| {
            self.session.is_displayed(fresh.node())
        })
    }

    /// Whether the handle's node has left the document. Never recovers.
    pub fn is_stale(&self, handle: &ElementHandle) -> bool {
        matches!(self.session.is_displayed(handle.node()), Err(err) if err.is_stale())
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Run `op` on `handle`; on staleness rebuild the handle once and retry
    pub fn with_recovery<T, F>(
        &self,
        handle: &ElementHandle,
        options: RebuildOptions,
        op: F,
    ) -> TenazResult<T>
    where
        F: Fn(&ElementHandle) -> TenazResult<T>,
    {
        match op(handle) {
            Err(stale) if stale.is_stale() => {
                warn!(element = %handle, "stale element reference, rebuilding from session root");
                let fresh = self.reconstructor().recover(handle, options, &stale)?;
                match op(&fresh) {
                    Err(again) if again.is_stale() => {
                        error!(element = %handle, "rebuilt element went stale again");
                        Err(TenazError::ReconstructionFailed {
                            element: handle.to_string(),
                            reason: format!("rebuilt element went stale again: {again}"),
                            stale: stale.to_string(),
                        })
                    }
                    retried => retried,
                }
            }
            other => other,
        }
    }
}
